/// Opcodes of the DVI format, as listed in section 585 of "TeX: The Program".
pub const SET_CHAR_0: u8 = 0;
pub const SET_CHAR_127: u8 = 127;
pub const SET1: u8 = 128;
pub const SET_RULE: u8 = 132;
pub const PUT1: u8 = 133;
pub const PUT_RULE: u8 = 137;
pub const NOP: u8 = 138;
pub const BOP: u8 = 139;
pub const EOP: u8 = 140;
pub const PUSH: u8 = 141;
pub const POP: u8 = 142;
pub const RIGHT1: u8 = 143;
pub const W0: u8 = 147;
pub const W1: u8 = 148;
pub const X0: u8 = 152;
pub const X1: u8 = 153;
pub const DOWN1: u8 = 157;
pub const Y0: u8 = 161;
pub const Y1: u8 = 162;
pub const Z0: u8 = 166;
pub const Z1: u8 = 167;
pub const FNT_NUM_0: u8 = 171;
pub const FNT_NUM_63: u8 = 234;
pub const FNT1: u8 = 235;
pub const FNT4: u8 = 238;
pub const XXX1: u8 = 239;
pub const XXX4: u8 = 242;
pub const FNT_DEF1: u8 = 243;
pub const FNT_DEF4: u8 = 246;
pub const PRE: u8 = 247;
pub const POST: u8 = 248;
pub const POST_POST: u8 = 249;

/// The only DVI format identifier this loader accepts.
pub const DVI_ID: u8 = 2;

/// The byte that pads the end of a DVI file after post_post.
pub const TRAILER: u8 = 223;

/// Size of a bop command's parameters: ten \count registers and a pointer.
pub const BOP_PARAMETERS_LENGTH: usize = 10 * 4 + 4;

/// Describes what follows an opcode inside a page, without interpreting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// The command is followed by a fixed number of parameter bytes.
    Fixed(usize),
    /// fnt_num_n: selects a font whose number is encoded in the opcode.
    FontNum(u32),
    /// fnt1..fnt4: selects a font given by an n-byte parameter.
    Font(usize),
    /// xxx1..xxx4: an n-byte length followed by that many special bytes.
    Special(usize),
    /// fnt_def1..fnt_def4 with an n-byte font number.
    FontDef(usize),
    EndOfPage,
    /// Anything that may not appear between bop and eop.
    Illegal,
}

/// Classifies a page-level opcode for the lightweight page scan.
pub fn operand_of(opcode: u8) -> Operand {
    match opcode {
        SET_CHAR_0..=SET_CHAR_127 => Operand::Fixed(0),
        SET1..=131 => Operand::Fixed((opcode - SET1 + 1) as usize),
        SET_RULE => Operand::Fixed(8),
        PUT1..=136 => Operand::Fixed((opcode - PUT1 + 1) as usize),
        PUT_RULE => Operand::Fixed(8),
        NOP | PUSH | POP => Operand::Fixed(0),
        EOP => Operand::EndOfPage,
        RIGHT1..=146 => Operand::Fixed((opcode - RIGHT1 + 1) as usize),
        W0 | X0 | Y0 | Z0 => Operand::Fixed(0),
        W1..=151 => Operand::Fixed((opcode - W1 + 1) as usize),
        X1..=156 => Operand::Fixed((opcode - X1 + 1) as usize),
        DOWN1..=160 => Operand::Fixed((opcode - DOWN1 + 1) as usize),
        Y1..=165 => Operand::Fixed((opcode - Y1 + 1) as usize),
        Z1..=170 => Operand::Fixed((opcode - Z1 + 1) as usize),
        FNT_NUM_0..=FNT_NUM_63 => Operand::FontNum((opcode - FNT_NUM_0) as u32),
        FNT1..=FNT4 => Operand::Font((opcode - FNT1 + 1) as usize),
        XXX1..=XXX4 => Operand::Special((opcode - XXX1 + 1) as usize),
        FNT_DEF1..=FNT_DEF4 => Operand::FontDef((opcode - FNT_DEF1 + 1) as usize),
        _ => Operand::Illegal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_classifies_movement_commands() {
        assert_eq!(operand_of(0), Operand::Fixed(0));
        assert_eq!(operand_of(131), Operand::Fixed(4));
        assert_eq!(operand_of(SET_RULE), Operand::Fixed(8));
        assert_eq!(operand_of(143), Operand::Fixed(1));
        assert_eq!(operand_of(146), Operand::Fixed(4));
        assert_eq!(operand_of(W0), Operand::Fixed(0));
        assert_eq!(operand_of(170), Operand::Fixed(4));
    }

    #[test]
    fn it_classifies_font_and_special_commands() {
        assert_eq!(operand_of(171), Operand::FontNum(0));
        assert_eq!(operand_of(234), Operand::FontNum(63));
        assert_eq!(operand_of(235), Operand::Font(1));
        assert_eq!(operand_of(242), Operand::Special(4));
        assert_eq!(operand_of(243), Operand::FontDef(1));
        assert_eq!(operand_of(EOP), Operand::EndOfPage);
    }

    #[test]
    fn it_rejects_commands_outside_pages() {
        assert_eq!(operand_of(BOP), Operand::Illegal);
        assert_eq!(operand_of(PRE), Operand::Illegal);
        assert_eq!(operand_of(POST), Operand::Illegal);
        assert_eq!(operand_of(POST_POST), Operand::Illegal);
        assert_eq!(operand_of(255), Operand::Illegal);
    }
}
