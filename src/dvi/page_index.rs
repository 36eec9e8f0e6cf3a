use std::str;

use log::{debug, warn};

use super::byte_cursor::{ByteCursor, CursorResult};
use super::error::{LoadError, LoadResult};
use super::fonts::{read_font_def, FontRegistry, Registration};
use super::opcodes::{
    operand_of, Operand, BOP, BOP_PARAMETERS_LENGTH, FNT_DEF1, FNT_DEF4, NOP,
};
use super::postamble::Postamble;
use super::specials::{classify, Special};
use crate::page_size::PageSize;

/// The pointer stored in the first page's bop.
const NO_PREVIOUS_PAGE: u32 = u32::MAX;

/// Recovers the offset of every bop, in file order, by following the
/// pointers each bop keeps to the previous one, starting from the last
/// page named in the postamble.
///
/// `first_page_bound` is where pages may start (just after the preamble) and
/// `postamble_offset` is where the last one must end.
pub fn index_pages(
    data: &[u8],
    first_page_bound: usize,
    postamble_offset: u32,
    postamble: &Postamble,
) -> LoadResult<Vec<u32>> {
    let total = postamble.total_pages as usize;
    let mut offsets = vec![0; total];

    let mut reader = ByteCursor::new(data);
    let mut current = postamble.last_page_offset;
    let mut upper_bound = postamble_offset as usize;

    for page in (0..total).rev() {
        let corrupt = |offset: u32, reason: String| LoadError::CorruptPage {
            page,
            offset,
            reason,
        };

        if is_chain_end(current) {
            return Err(corrupt(
                current,
                format!(
                    "the page chain ends after {} of {} pages",
                    total - page - 1,
                    total
                ),
            ));
        }
        let start = current as usize;
        if start < first_page_bound || start >= upper_bound {
            return Err(corrupt(
                current,
                format!(
                    "page pointer is outside of {}..{}",
                    first_page_bound, upper_bound
                ),
            ));
        }

        reader.seek(start);
        let opcode = reader
            .read_1_byte_unsigned()
            .map_err(|err| corrupt(current, err.to_string()))?;
        if opcode != BOP {
            return Err(corrupt(
                current,
                format!("expected bop, found opcode {}", opcode),
            ));
        }
        reader
            .skip(BOP_PARAMETERS_LENGTH - 4)
            .map_err(|err| corrupt(current, err.to_string()))?;
        let previous = reader
            .read_4_bytes_unsigned()
            .map_err(|err| corrupt(current, err.to_string()))?;
        if reader.position() > upper_bound {
            return Err(corrupt(
                current,
                "bop overlaps the following page".to_string(),
            ));
        }

        offsets[page] = current;
        upper_bound = start;
        current = previous;
    }

    if total > 0 && !is_chain_end(current) {
        return Err(LoadError::CorruptPage {
            page: 0,
            offset: offsets[0],
            reason: format!(
                "the first page points back to {} instead of ending the chain",
                current
            ),
        });
    }

    debug!("indexed {} pages", total);
    Ok(offsets)
}

// TeX writes -1 for the first page; 0 is accepted too since the preamble
// always sits there.
fn is_chain_end(pointer: u32) -> bool {
    pointer == NO_PREVIOUS_PAGE || pointer == 0
}

/// What the prescan learned about the pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrescanSummary {
    pub number_of_external_ps_files: u32,
    pub source_specials_seen: bool,
    pub suggested_page_size: Option<PageSize>,
}

/// Skims over page contents without interpreting them, only looking at
/// font selections, font definitions and specials.
pub struct PageScanner<'a, 'f> {
    reader: ByteCursor<'a>,
    fonts: &'f mut FontRegistry,
    error_counter: u32,
    summary: PrescanSummary,
}

impl<'a, 'f> PageScanner<'a, 'f> {
    pub fn new(data: &'a [u8], fonts: &'f mut FontRegistry) -> Self {
        PageScanner {
            reader: ByteCursor::new(data),
            fonts,
            error_counter: 0,
            summary: PrescanSummary::default(),
        }
    }

    /// Scans every page and the gaps between them. `postamble_offset` marks
    /// the end of the last page.
    pub fn scan_all(
        mut self,
        first_page_bound: usize,
        offsets: &[u32],
        postamble_offset: u32,
    ) -> (PrescanSummary, u32) {
        let mut gap_start = first_page_bound;
        for (page, &start) in offsets.iter().enumerate() {
            self.scan_gap(gap_start, start as usize);

            let end = offsets
                .get(page + 1)
                .map_or(postamble_offset, |next| *next) as usize;
            gap_start = self.scan_page(page, start as usize, end);
        }
        self.scan_gap(gap_start, postamble_offset as usize);

        (self.summary, self.error_counter)
    }

    fn anomaly(&mut self, message: String) {
        warn!("{}", message);
        self.error_counter = self.error_counter.saturating_add(1);
    }

    /// Between pages only nop and fnt_def may appear.
    fn scan_gap(&mut self, start: usize, end: usize) {
        self.reader.seek(start);
        while self.reader.position() < end {
            let offset = self.reader.position();
            let result = match self.reader.read_1_byte_unsigned() {
                Ok(NOP) => Ok(()),
                Ok(opcode @ FNT_DEF1..=FNT_DEF4) => {
                    self.define_font((opcode - FNT_DEF1 + 1) as usize)
                }
                Ok(opcode) => {
                    self.anomaly(format!(
                        "unexpected opcode {} between pages at offset {}",
                        opcode, offset
                    ));
                    return;
                }
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                self.anomaly(format!("bad command between pages: {}", err));
                return;
            }
        }
    }

    /// Returns the offset just past the page's eop, or `end` if the page
    /// couldn't be scanned to its eop.
    fn scan_page(&mut self, page: usize, start: usize, end: usize) -> usize {
        self.reader.seek(start + 1 + BOP_PARAMETERS_LENGTH);

        loop {
            if self.reader.position() >= end {
                self.anomaly(format!("page {} has no eop", page));
                return end;
            }

            match self.scan_command() {
                Ok(true) => return self.reader.position(),
                Ok(false) => {}
                Err(message) => {
                    self.anomaly(format!("page {}: {}", page, message));
                    return end;
                }
            }
        }
    }

    /// Scans one command, returning whether it was eop.
    fn scan_command(&mut self) -> Result<bool, String> {
        let offset = self.reader.position();
        let opcode = self
            .reader
            .read_1_byte_unsigned()
            .map_err(|err| err.to_string())?;

        let result = match operand_of(opcode) {
            Operand::Fixed(length) => self.reader.skip(length),
            Operand::FontNum(font_num) => {
                self.select_font(font_num);
                Ok(())
            }
            Operand::Font(size) => {
                self.reader.read_unsigned(size).map(|font_num| {
                    self.select_font(font_num);
                })
            }
            Operand::Special(size) => self.special(size),
            Operand::FontDef(size) => self.define_font(size),
            Operand::EndOfPage => return Ok(true),
            Operand::Illegal => {
                return Err(format!(
                    "illegal opcode {} at offset {}",
                    opcode, offset
                ));
            }
        };

        result.map(|_| false).map_err(|err| err.to_string())
    }

    fn select_font(&mut self, font_num: u32) {
        if self.fonts.ensure_defined(font_num) {
            self.error_counter = self.error_counter.saturating_add(1);
        }
    }

    fn define_font(&mut self, size: usize) -> CursorResult<()> {
        let font = read_font_def(&mut self.reader, size)?;
        if self.fonts.register(font) == Registration::Conflict {
            self.error_counter = self.error_counter.saturating_add(1);
        }
        Ok(())
    }

    fn special(&mut self, size: usize) -> CursorResult<()> {
        let length = self.reader.read_unsigned(size)?;
        let bytes = self.reader.read_array(length as usize)?;

        let text = match str::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                self.anomaly("skipping a special that isn't utf-8".to_string());
                return Ok(());
            }
        };

        match classify(text) {
            Ok(Special::PostScriptFile) => {
                self.summary.number_of_external_ps_files += 1;
            }
            Ok(Special::Source) => {
                self.summary.source_specials_seen = true;
            }
            Ok(Special::PaperSize(size)) => {
                if self.summary.suggested_page_size.is_none() {
                    self.summary.suggested_page_size = Some(size);
                }
            }
            Ok(Special::Other) => {}
            Err(malformed) => {
                self.anomaly(format!(
                    "skipping malformed special {:?}",
                    malformed.0
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dvi::fonts::FontDefinition;

    fn postamble(last_page_offset: u32, total_pages: u16) -> Postamble {
        Postamble {
            last_page_offset,
            num: 25400000,
            den: 473628672,
            mag: 1000,
            max_page_height: 0,
            max_page_width: 0,
            max_stack_depth: 0,
            total_pages,
        }
    }

    fn bop(previous: i32) -> Vec<u8> {
        let mut bytes = vec![BOP];
        bytes.extend_from_slice(&[0; 40]);
        bytes.extend_from_slice(&previous.to_be_bytes());
        bytes
    }

    // Three pages starting at 1, 47 and 93, each an empty bop/eop, followed
    // by the post command at 139.
    fn three_pages() -> Vec<u8> {
        let mut data = vec![NOP];
        data.extend(bop(-1));
        data.push(140);
        data.extend(bop(1));
        data.push(140);
        data.extend(bop(47));
        data.push(140);
        data.push(248);
        data
    }

    #[test]
    fn it_follows_back_pointers() {
        let data = three_pages();
        assert_eq!(
            index_pages(&data, 1, 139, &postamble(93, 3)).unwrap(),
            vec![1, 47, 93]
        );
    }

    #[test]
    fn it_indexes_empty_documents() {
        let data = three_pages();
        assert_eq!(
            index_pages(&data, 1, 139, &postamble(u32::MAX, 0)).unwrap(),
            Vec::<u32>::new()
        );
    }

    #[test]
    fn it_rejects_chains_that_are_too_short() {
        let data = three_pages();
        let result = index_pages(&data, 1, 139, &postamble(93, 4));
        assert!(matches!(result, Err(LoadError::CorruptPage { page: 0, .. })));
    }

    #[test]
    fn it_rejects_chains_that_are_too_long() {
        let data = three_pages();
        let result = index_pages(&data, 1, 139, &postamble(93, 2));
        assert!(matches!(result, Err(LoadError::CorruptPage { page: 0, .. })));
    }

    #[test]
    fn it_rejects_pointers_to_non_pages() {
        let mut data = three_pages();
        // Point the last page back into the middle of the second one.
        data[93 + 41..93 + 45].copy_from_slice(&50i32.to_be_bytes());
        let result = index_pages(&data, 1, 139, &postamble(93, 3));
        assert!(matches!(
            result,
            Err(LoadError::CorruptPage {
                page: 1,
                offset: 50,
                ..
            })
        ));
    }

    #[test]
    fn it_rejects_pointers_that_go_forward() {
        let mut data = three_pages();
        data[47 + 41..47 + 45].copy_from_slice(&93i32.to_be_bytes());
        let result = index_pages(&data, 1, 139, &postamble(93, 3));
        assert!(matches!(result, Err(LoadError::CorruptPage { page: 0, .. })));

        let result = index_pages(&data, 1, 139, &postamble(500, 3));
        assert!(matches!(result, Err(LoadError::CorruptPage { page: 2, .. })));
    }

    fn page_with(contents: &[u8]) -> Vec<u8> {
        let mut data = bop(-1);
        data.extend_from_slice(contents);
        data.push(140);
        data
    }

    fn scan(data: &[u8], fonts: &mut FontRegistry) -> (PrescanSummary, u32) {
        let end = data.len() as u32;
        PageScanner::new(data, fonts).scan_all(0, &[0], end)
    }

    #[test]
    fn it_adds_placeholders_for_undefined_fonts() {
        let mut fonts = FontRegistry::new();
        fonts.register(FontDefinition::new(0, 1, 2, 3, "cmr10".to_string()));

        #[rustfmt::skip]
        let data = page_with(&[
            // fnt_num_0
            171,
            // fnt1 99
            235, 99,
            b'a',
            // fnt_num_0, fnt1 99 again
            171,
            235, 99,
        ]);

        let (_, errors) = scan(&data, &mut fonts);
        assert_eq!(errors, 1);
        assert!(fonts.get(99).unwrap().is_placeholder());
        assert!(!fonts.get(0).unwrap().is_placeholder());
    }

    #[test]
    fn it_registers_fonts_defined_on_pages() {
        let mut fonts = FontRegistry::new();

        #[rustfmt::skip]
        let data = page_with(&[
            // fnt_def1
            243,
            7,
            0, 0, 0, 1,
            0, 10, 0, 0,
            0, 10, 0, 0,
            0,
            4,
            b'c', b'm', b'r', b'7',
            // fnt_num_7
            178,
        ]);

        let (_, errors) = scan(&data, &mut fonts);
        assert_eq!(errors, 0);
        assert_eq!(fonts.get(7).unwrap().font_name, "cmr7");
    }

    #[test]
    fn it_skips_command_parameters() {
        let mut fonts = FontRegistry::new();
        fonts.register(FontDefinition::new(0, 1, 2, 3, "cmr10".to_string()));

        #[rustfmt::skip]
        let data = page_with(&[
            // set_rule, whose parameters would look like fnt_num commands
            132, 171, 172, 173, 174, 175, 176, 177, 178,
            // right3, down4
            145, 255, 21, 160,
            160, 248, 164, 50, 235,
            // push, w0, pop
            141, 147, 142,
            // set1 200
            128, 200,
            // fnt_num_0
            171,
        ]);

        let (_, errors) = scan(&data, &mut fonts);
        assert_eq!(errors, 0);
        assert_eq!(fonts.len(), 1);
    }

    #[test]
    fn it_inspects_specials() {
        let mut fonts = FontRegistry::new();
        let mut contents = Vec::new();
        for special in &[
            "psfile=a.eps",
            "PSfile=b.eps",
            "src:10 a.tex",
            "src:11 a.tex",
            "papersize=21cm,29.7cm",
            "papersize=10cm,10cm",
            "color push gray 0",
        ] {
            contents.push(239);
            contents.push(special.len() as u8);
            contents.extend_from_slice(special.as_bytes());
        }
        // xxx4 with a malformed paper size
        contents.extend_from_slice(&[242, 0, 0, 0, 12]);
        contents.extend_from_slice(b"papersize=A4");

        let (summary, errors) = scan(&page_with(&contents), &mut fonts);
        assert_eq!(summary.number_of_external_ps_files, 2);
        assert!(summary.source_specials_seen);
        let size = summary.suggested_page_size.unwrap();
        assert!((size.width.cm() - 21.0).abs() < 1e-9);
        assert_eq!(errors, 1);
    }

    #[test]
    fn it_tolerates_garbage_in_pages() {
        let mut fonts = FontRegistry::new();

        // An undefined opcode, then a special that claims to be longer than
        // the file.
        let (_, errors) = scan(&page_with(&[250]), &mut fonts);
        assert_eq!(errors, 1);

        let (_, errors) = scan(&page_with(&[239, 200, b'x']), &mut fonts);
        assert_eq!(errors, 1);
    }

    #[test]
    fn it_counts_specials_that_are_not_utf8_once() {
        let mut fonts = FontRegistry::new();

        // xxx1 holding 0xff, then a special that is fine.
        #[rustfmt::skip]
        let data = page_with(&[
            239, 1, 0xff,
            239, 3, b'a', b'b', b'c',
        ]);

        let (summary, errors) = scan(&data, &mut fonts);
        assert_eq!(errors, 1);
        assert_eq!(summary, PrescanSummary::default());
    }

    #[test]
    fn it_saturates_the_error_counter() {
        let mut fonts = FontRegistry::new();
        let data = page_with(&[250]);

        let mut scanner = PageScanner::new(&data, &mut fonts);
        scanner.error_counter = u32::MAX;
        let end = data.len() as u32;
        let (_, errors) = scanner.scan_all(0, &[0], end);
        assert_eq!(errors, u32::MAX);
    }

    #[test]
    fn it_scans_fonts_between_pages() {
        let mut fonts = FontRegistry::new();

        let mut data = page_with(&[]);
        #[rustfmt::skip]
        let between: &[u8] = &[
            138,
            243,
            1,
            0, 0, 0, 1,
            0, 10, 0, 0,
            0, 10, 0, 0,
            0,
            2,
            b'c', b'm',
        ];
        data.extend_from_slice(between);
        let second = data.len() as u32;
        data.extend(page_with(&[172]));
        let end = data.len() as u32;

        let (_, errors) =
            PageScanner::new(&data, &mut fonts).scan_all(0, &[0, second], end);
        assert_eq!(errors, 0);
        assert_eq!(fonts.get(1).unwrap().font_name, "cm");
    }
}
