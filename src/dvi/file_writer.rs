/// Methods for writing DVI files
use std::collections::BTreeMap;

use super::fonts::FontDefinition;
use super::opcodes::{
    BOP, DVI_ID, EOP, FNT1, FNT_DEF1, FNT_NUM_0, POP, POST, POST_POST, PRE,
    PUSH, SET1, TRAILER, XXX1,
};

/// Builds a DVI file in memory, keeping track of the bookkeeping TeX does
/// while shipping out pages: the back-pointers between bops, the fonts used
/// and the maximum stack depth, which all end up in the postamble.
pub struct DVIFileWriter {
    output: Vec<u8>,
    num: u32,
    den: u32,
    mag: u32,
    last_bop: Option<u32>,
    total_pages: u16,
    fonts: BTreeMap<u32, FontDefinition>,
    stack_depth: u16,
    max_stack_depth: u16,
    max_page_height: u32,
    max_page_width: u32,
}

macro_rules! generate_int_writer_func {
    (fn $func_name:ident($input_type:ident, $from:expr, $to:expr)) => {
        fn $func_name(&mut self, value: $input_type) {
            self.output.extend_from_slice(&value.to_be_bytes()[$from..$to]);
        }
    };
}

impl DVIFileWriter {
    pub fn new(num: u32, den: u32, mag: u32, comment: &[u8]) -> Self {
        let mut writer = DVIFileWriter {
            output: Vec::new(),
            num,
            den,
            mag,
            last_bop: None,
            total_pages: 0,
            fonts: BTreeMap::new(),
            stack_depth: 0,
            max_stack_depth: 0,
            max_page_height: 0,
            max_page_width: 0,
        };

        writer.write_1_byte_unsigned(PRE);
        writer.write_1_byte_unsigned(DVI_ID);
        writer.write_4_bytes_unsigned(num);
        writer.write_4_bytes_unsigned(den);
        writer.write_4_bytes_unsigned(mag);
        writer.write_array(comment, comment.len().min(255));
        writer
    }

    /// A writer with TeX's usual units: scaled points at magnification 1000.
    pub fn with_tex_units(comment: &[u8]) -> Self {
        DVIFileWriter::new(25400000, 473628672, 1000, comment)
    }

    generate_int_writer_func!(fn write_1_byte_unsigned(u8, 0, 1));
    generate_int_writer_func!(fn write_4_bytes_unsigned(u32, 0, 4));
    generate_int_writer_func!(fn write_4_bytes_signed(i32, 0, 4));
    generate_int_writer_func!(fn write_2_bytes_unsigned(u16, 0, 2));

    // Writes a length byte followed by at most 255 bytes of the array.
    fn write_array(&mut self, value: &[u8], size: usize) {
        self.write_1_byte_unsigned(size as u8);
        self.output.extend_from_slice(&value[0..size]);
    }

    /// The current offset into the file.
    pub fn position(&self) -> u32 {
        self.output.len() as u32
    }

    pub fn set_max_page_size(&mut self, width: u32, height: u32) {
        self.max_page_width = width;
        self.max_page_height = height;
    }

    /// Defines a font at the current position and remembers it for the
    /// postamble.
    pub fn define_font(&mut self, font: &FontDefinition) {
        self.write_font_def(font);
        self.fonts.entry(font.font_num).or_insert_with(|| font.clone());
    }

    fn write_font_def(&mut self, font: &FontDefinition) {
        self.write_1_byte_unsigned(FNT_DEF1 + 3);
        self.write_4_bytes_unsigned(font.font_num);
        self.write_4_bytes_unsigned(font.checksum);
        self.write_4_bytes_unsigned(font.scale);
        self.write_4_bytes_unsigned(font.design_size);
        self.write_1_byte_unsigned(0);
        let name = font.font_name.as_bytes();
        self.write_array(name, name.len().min(255));
    }

    /// Starts a page, returning the offset of its bop.
    pub fn begin_page(&mut self, counts: [i32; 10]) -> u32 {
        let offset = self.position();
        self.write_1_byte_unsigned(BOP);
        for count in counts.iter() {
            self.write_4_bytes_signed(*count);
        }
        let previous = self.last_bop.map_or(-1, |bop| bop as i32);
        self.write_4_bytes_signed(previous);

        self.last_bop = Some(offset);
        self.total_pages += 1;
        self.stack_depth = 0;
        offset
    }

    pub fn end_page(&mut self) {
        self.write_1_byte_unsigned(EOP);
    }

    pub fn push(&mut self) {
        self.stack_depth += 1;
        self.max_stack_depth = self.max_stack_depth.max(self.stack_depth);
        self.write_1_byte_unsigned(PUSH);
    }

    pub fn pop(&mut self) {
        self.stack_depth = self.stack_depth.saturating_sub(1);
        self.write_1_byte_unsigned(POP);
    }

    pub fn select_font(&mut self, font_num: u32) {
        if font_num < 64 {
            self.write_1_byte_unsigned(FNT_NUM_0 + font_num as u8);
        } else {
            self.write_1_byte_unsigned(FNT1 + 3);
            self.write_4_bytes_unsigned(font_num);
        }
    }

    pub fn set_char(&mut self, chr: u8) {
        if chr >= 128 {
            self.write_1_byte_unsigned(SET1);
        }
        self.write_1_byte_unsigned(chr);
    }

    pub fn special(&mut self, text: &str) {
        self.write_1_byte_unsigned(XXX1 + 3);
        self.write_4_bytes_unsigned(text.len() as u32);
        self.output.extend_from_slice(text.as_bytes());
    }

    /// Appends raw bytes, for building deliberately broken files.
    pub fn raw(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    /// Writes the postamble, the font definitions again and the trailer.
    pub fn finish(mut self) -> Vec<u8> {
        let post = self.position();
        self.write_1_byte_unsigned(POST);
        self.write_4_bytes_signed(self.last_bop.map_or(-1, |bop| bop as i32));
        self.write_4_bytes_unsigned(self.num);
        self.write_4_bytes_unsigned(self.den);
        self.write_4_bytes_unsigned(self.mag);
        self.write_4_bytes_unsigned(self.max_page_height);
        self.write_4_bytes_unsigned(self.max_page_width);
        self.write_2_bytes_unsigned(self.max_stack_depth);
        self.write_2_bytes_unsigned(self.total_pages);

        let fonts = std::mem::take(&mut self.fonts);
        for font in fonts.values() {
            self.write_font_def(font);
        }

        self.write_1_byte_unsigned(POST_POST);
        self.write_4_bytes_unsigned(post);
        self.write_1_byte_unsigned(DVI_ID);

        // At least four 223s, and enough to make the length a multiple of 4.
        self.output.extend_from_slice(&[TRAILER; 4]);
        while self.output.len() % 4 != 0 {
            self.write_1_byte_unsigned(TRAILER);
        }

        self.output
    }
}
