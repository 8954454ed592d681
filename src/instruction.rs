//! # instruction
//!
//! One variant per CHIP-8 instruction. Register operands are kept as plain
//! indices (0x0-0xF); every field is pulled out of the opcode with its own
//! explicit mask-then-shift so there's no precedence to get wrong.
use crate::error::{Chip8Error, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 00E0 (also 0x0000 and anything else in group 0 ending in 0)
    Cls,
    /// 00EE
    Ret,
    /// 1NNN
    Jp(u16),
    /// 2NNN
    Call(u16),
    /// 3XNN
    SeByte(usize, u8),
    /// 4XNN
    SneByte(usize, u8),
    /// 5XY0
    SeReg(usize, usize),
    /// 6XNN
    LdByte(usize, u8),
    /// 7XNN
    AddByte(usize, u8),
    /// 8XY0
    LdReg(usize, usize),
    /// 8XY1
    Or(usize, usize),
    /// 8XY2
    And(usize, usize),
    /// 8XY3
    Xor(usize, usize),
    /// 8XY4
    AddReg(usize, usize),
    /// 8XY5
    Sub(usize, usize),
    /// 8XY6
    Shr(usize),
    /// 8XY7
    Subn(usize, usize),
    /// 8XYE
    Shl(usize),
    /// 9XY0
    SneReg(usize, usize),
    /// ANNN
    LdI(u16),
    /// BNNN
    JpV0(u16),
    /// CXNN
    Rnd(usize, u8),
    /// DXYN
    Drw(usize, usize, u8),
    /// EX9E
    Skp(usize),
    /// EXA1
    Sknp(usize),
    /// FX07
    LdRegDt(usize),
    /// FX0A
    LdKey(usize),
    /// FX15
    LdDtReg(usize),
    /// FX18
    LdSt(usize),
    /// FX1E
    AddI(usize),
    /// FX29
    LdF(usize),
    /// FX33
    LdB(usize),
    /// FX55
    LdDerefIReg(usize),
    /// FX65
    LdRegDerefI(usize),
}

fn x(opcode: u16) -> usize {
    ((opcode & 0x0F00) >> 8) as usize
}

fn y(opcode: u16) -> usize {
    ((opcode & 0x00F0) >> 4) as usize
}

fn n(opcode: u16) -> u8 {
    (opcode & 0x000F) as u8
}

fn nn(opcode: u16) -> u8 {
    (opcode & 0x00FF) as u8
}

fn nnn(opcode: u16) -> u16 {
    opcode & 0x0FFF
}

impl Instruction {
    /// `pc` is only carried into the error for unknown opcodes
    pub fn decode(opcode: u16, pc: u16) -> Result<Self> {
        use Instruction::*;
        let unknown = Chip8Error::UnknownOpcode { opcode, pc };
        let ins = match opcode & 0xF000 {
            0x0000 => match opcode & 0x000F {
                0x0 => Cls,
                0xE => Ret,
                _ => return Err(unknown),
            },
            0x1000 => Jp(nnn(opcode)),
            0x2000 => Call(nnn(opcode)),
            0x3000 => SeByte(x(opcode), nn(opcode)),
            0x4000 => SneByte(x(opcode), nn(opcode)),
            // the low nibble isn't checked for 5XY0/9XY0
            0x5000 => SeReg(x(opcode), y(opcode)),
            0x6000 => LdByte(x(opcode), nn(opcode)),
            0x7000 => AddByte(x(opcode), nn(opcode)),
            0x8000 => match opcode & 0x000F {
                0x0 => LdReg(x(opcode), y(opcode)),
                0x1 => Or(x(opcode), y(opcode)),
                0x2 => And(x(opcode), y(opcode)),
                0x3 => Xor(x(opcode), y(opcode)),
                0x4 => AddReg(x(opcode), y(opcode)),
                0x5 => Sub(x(opcode), y(opcode)),
                0x6 => Shr(x(opcode)),
                0x7 => Subn(x(opcode), y(opcode)),
                0xE => Shl(x(opcode)),
                _ => return Err(unknown),
            },
            0x9000 => SneReg(x(opcode), y(opcode)),
            0xA000 => LdI(nnn(opcode)),
            0xB000 => JpV0(nnn(opcode)),
            0xC000 => Rnd(x(opcode), nn(opcode)),
            0xD000 => Drw(x(opcode), y(opcode), n(opcode)),
            0xE000 => match opcode & 0x00FF {
                0x9E => Skp(x(opcode)),
                0xA1 => Sknp(x(opcode)),
                _ => return Err(unknown),
            },
            0xF000 => match opcode & 0x00FF {
                0x07 => LdRegDt(x(opcode)),
                0x0A => LdKey(x(opcode)),
                0x15 => LdDtReg(x(opcode)),
                0x18 => LdSt(x(opcode)),
                0x1E => AddI(x(opcode)),
                0x29 => LdF(x(opcode)),
                0x33 => LdB(x(opcode)),
                0x55 => LdDerefIReg(x(opcode)),
                0x65 => LdRegDerefI(x(opcode)),
                _ => return Err(unknown),
            },
            _ => unreachable!("high nibble has only 16 values"),
        };
        Ok(ins)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        match *self {
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jp(a) => write!(f, "JP {:#05X}", a),
            Call(a) => write!(f, "CALL {:#05X}", a),
            SeByte(x, b) => write!(f, "SE V{:X}, {:#04X}", x, b),
            SneByte(x, b) => write!(f, "SNE V{:X}, {:#04X}", x, b),
            SeReg(x, y) => write!(f, "SE V{:X}, V{:X}", x, y),
            LdByte(x, b) => write!(f, "LD V{:X}, {:#04X}", x, b),
            AddByte(x, b) => write!(f, "ADD V{:X}, {:#04X}", x, b),
            LdReg(x, y) => write!(f, "LD V{:X}, V{:X}", x, y),
            Or(x, y) => write!(f, "OR V{:X}, V{:X}", x, y),
            And(x, y) => write!(f, "AND V{:X}, V{:X}", x, y),
            Xor(x, y) => write!(f, "XOR V{:X}, V{:X}", x, y),
            AddReg(x, y) => write!(f, "ADD V{:X}, V{:X}", x, y),
            Sub(x, y) => write!(f, "SUB V{:X}, V{:X}", x, y),
            Shr(x) => write!(f, "SHR V{:X}", x),
            Subn(x, y) => write!(f, "SUBN V{:X}, V{:X}", x, y),
            Shl(x) => write!(f, "SHL V{:X}", x),
            SneReg(x, y) => write!(f, "SNE V{:X}, V{:X}", x, y),
            LdI(a) => write!(f, "LD I, {:#05X}", a),
            JpV0(a) => write!(f, "JP V0, {:#05X}", a),
            Rnd(x, b) => write!(f, "RND V{:X}, {:#04X}", x, b),
            Drw(x, y, n) => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            Skp(x) => write!(f, "SKP V{:X}", x),
            Sknp(x) => write!(f, "SKNP V{:X}", x),
            LdRegDt(x) => write!(f, "LD V{:X}, DT", x),
            LdKey(x) => write!(f, "LD V{:X}, K", x),
            LdDtReg(x) => write!(f, "LD DT, V{:X}", x),
            LdSt(x) => write!(f, "LD ST, V{:X}", x),
            AddI(x) => write!(f, "ADD I, V{:X}", x),
            LdF(x) => write!(f, "LD F, V{:X}", x),
            LdB(x) => write!(f, "LD B, V{:X}", x),
            LdDerefIReg(x) => write!(f, "LD [I], V{:X}", x),
            LdRegDerefI(x) => write!(f, "LD V{:X}, [I]", x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Instruction::*;

    #[test]
    fn test_opcode_translation() {
        let cases = [
            (0x00E0, Cls),
            (0x00EE, Ret),
            (0x1234, Jp(0x234)),
            (0x2456, Call(0x456)),
            (0x342A, SeByte(0x4, 0x2A)),
            (0x4A75, SneByte(0xA, 0x75)),
            (0x5AE0, SeReg(0xA, 0xE)),
            (0x63F5, LdByte(0x3, 0xF5)),
            (0x7B12, AddByte(0xB, 0x12)),
            (0x8590, LdReg(0x5, 0x9)),
            (0x8101, Or(0x1, 0x0)),
            (0x8642, And(0x6, 0x4)),
            (0x87F3, Xor(0x7, 0xF)),
            (0x8264, AddReg(0x2, 0x6)),
            (0x8C45, Sub(0xC, 0x4)),
            (0x8106, Shr(0x1)),
            (0x86D7, Subn(0x6, 0xD)),
            (0x8E0E, Shl(0xE)),
            (0x9990, SneReg(0x9, 0x9)),
            (0xA568, LdI(0x568)),
            (0xBABC, JpV0(0xABC)),
            (0xC5AF, Rnd(0x5, 0xAF)),
            (0xD7B0, Drw(0x7, 0xB, 0)),
            (0xE49E, Skp(0x4)),
            (0xECA1, Sknp(0xC)),
            (0xF907, LdRegDt(0x9)),
            (0xFD0A, LdKey(0xD)),
            (0xF315, LdDtReg(0x3)),
            (0xF718, LdSt(0x7)),
            (0xF91E, AddI(0x9)),
            (0xFF29, LdF(0xF)),
            (0xF533, LdB(0x5)),
            (0xF655, LdDerefIReg(0x6)),
            (0xF865, LdRegDerefI(0x8)),
        ];
        for (opcode, ins) in cases {
            assert_eq!(Instruction::decode(opcode, 0x200).unwrap(), ins, "{:04X}", opcode);
        }
    }

    #[test]
    fn test_zero_word_clears_screen() {
        assert_eq!(Instruction::decode(0x0000, 0x200).unwrap(), Cls);
    }

    #[test]
    fn test_unknown_opcodes() {
        for opcode in [0x00E1u16, 0x8008, 0x800F, 0xE000, 0xE19F, 0xF000, 0xF0FF, 0xF130] {
            match Instruction::decode(opcode, 0x2a0) {
                Err(Chip8Error::UnknownOpcode { opcode: o, pc }) => {
                    assert_eq!(o, opcode);
                    assert_eq!(pc, 0x2a0);
                }
                other => panic!("{:04X} decoded as {:?}", opcode, other),
            }
        }
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(Drw(1, 2, 5).to_string(), "DRW V1, V2, 5");
        assert_eq!(Jp(0x2a0).to_string(), "JP 0x2A0");
        assert_eq!(LdByte(3, 0x1f).to_string(), "LD V3, 0x1F");
    }
}
