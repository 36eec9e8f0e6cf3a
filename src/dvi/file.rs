use std::fs;
use std::ops::Range;
use std::path::Path;

use log::{debug, info};

use super::byte_cursor::ByteCursor;
use super::error::{AccessError, LoadResult};
use super::fonts::{FontDefinition, FontRegistry};
use super::page_index::{index_pages, PageScanner, PrescanSummary};
use super::postamble::{find_postamble, Postamble};
use super::preamble::Preamble;
use crate::page_size::PageSize;

/// Knobs for loading a DVI file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Whether source specials should arm the one-shot notice. Viewers
    /// that don't care about inverse search turn this off.
    pub source_special_notice: bool,
    /// How many trailing 223s to skip at most while looking for the
    /// postamble. TeX writes between 4 and 7.
    pub max_trailer_padding: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            source_special_notice: true,
            max_trailer_padding: 64,
        }
    }
}

impl LoadOptions {
    pub fn source_special_notice(mut self, enabled: bool) -> Self {
        self.source_special_notice = enabled;
        self
    }

    pub fn max_trailer_padding(mut self, padding: usize) -> Self {
        self.max_trailer_padding = padding;
        self
    }
}

/// A fully indexed DVI file. All of the parsing happens in `load`; after
/// that only the error counter and the source special notice change.
#[derive(Debug)]
pub struct DVIFile {
    filename: Option<String>,
    data: Vec<u8>,
    preamble: Preamble,
    postamble: Postamble,
    beginning_of_postamble: u32,
    page_offsets: Vec<u32>,
    fonts: FontRegistry,
    prescan: PrescanSummary,
    cm_per_unit: f64,
    error_counter: u32,
    source_special_marker: bool,
}

impl DVIFile {
    /// Reads and indexes a DVI file from memory.
    pub fn load(data: Vec<u8>) -> LoadResult<Self> {
        DVIFile::load_with_options(data, &LoadOptions::default())
    }

    pub fn load_with_options(
        data: Vec<u8>,
        options: &LoadOptions,
    ) -> LoadResult<Self> {
        let mut reader = ByteCursor::new(&data);
        let mut fonts = FontRegistry::new();
        let mut error_counter = 0;

        let preamble = Preamble::read_from(&mut reader)?;
        let first_page_bound = reader.position();

        let beginning_of_postamble = find_postamble(
            &data,
            preamble.format,
            options.max_trailer_padding,
        )?;
        let postamble = Postamble::read_from(
            &mut reader,
            beginning_of_postamble,
            &preamble,
            &mut fonts,
            &mut error_counter,
        )?;

        let page_offsets = index_pages(
            &data,
            first_page_bound,
            beginning_of_postamble,
            &postamble,
        )?;

        let (prescan, prescan_errors) = PageScanner::new(&data, &mut fonts)
            .scan_all(first_page_bound, &page_offsets, beginning_of_postamble);
        error_counter = error_counter.saturating_add(prescan_errors);

        let source_special_marker =
            options.source_special_notice && prescan.source_specials_seen;
        let cm_per_unit = preamble.cm_per_unit();

        info!(
            "loaded DVI file: {} pages, {} fonts, {} PostScript files, {} errors",
            page_offsets.len(),
            fonts.len(),
            prescan.number_of_external_ps_files,
            error_counter
        );

        Ok(DVIFile {
            filename: None,
            data,
            preamble,
            postamble,
            beginning_of_postamble,
            page_offsets,
            fonts,
            prescan,
            cm_per_unit,
            error_counter,
            source_special_marker,
        })
    }

    /// Reads and indexes a DVI file from disk.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        options: &LoadOptions,
    ) -> LoadResult<Self> {
        let path = path.as_ref();
        debug!("reading {}", path.display());
        let data = fs::read(path)?;

        let mut file = DVIFile::load_with_options(data, options)?;
        file.filename = Some(path.display().to_string());
        Ok(file)
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn preamble(&self) -> &Preamble {
        &self.preamble
    }

    pub fn postamble(&self) -> &Postamble {
        &self.postamble
    }

    /// The preamble comment, usually naming the program that made the
    /// file.
    pub fn generator_string(&self) -> String {
        self.preamble.comment_string()
    }

    pub fn total_pages(&self) -> usize {
        self.page_offsets.len()
    }

    pub fn magnification(&self) -> u32 {
        self.preamble.mag
    }

    /// The number of centimeters per DVI unit in this DVI file.
    pub fn cm_per_dvi_unit(&self) -> f64 {
        self.cm_per_unit
    }

    pub fn beginning_of_postamble(&self) -> u32 {
        self.beginning_of_postamble
    }

    pub fn page_offsets(&self) -> &[u32] {
        &self.page_offsets
    }

    /// The offset of the bop of a page, counting from 0.
    pub fn page_offset(&self, index: usize) -> Result<u32, AccessError> {
        self.page_offsets
            .get(index)
            .copied()
            .ok_or(AccessError::PageIndexOutOfRange {
                index,
                total: self.total_pages(),
            })
    }

    /// The bytes a page occupies, from its bop up to the next page's bop
    /// or the postamble.
    pub fn page_range(&self, index: usize) -> Result<Range<usize>, AccessError> {
        let start = self.page_offset(index)? as usize;
        let end = self
            .page_offsets
            .get(index + 1)
            .copied()
            .unwrap_or(self.beginning_of_postamble) as usize;
        Ok(start..end)
    }

    pub fn page_data(&self, index: usize) -> Result<&[u8], AccessError> {
        let range = self.page_range(index)?;
        Ok(&self.data[range])
    }

    pub fn font_registry(&self) -> &FontRegistry {
        &self.fonts
    }

    pub fn fonts(&self) -> impl Iterator<Item = &FontDefinition> {
        self.fonts.iter()
    }

    pub fn number_of_external_ps_files(&self) -> u32 {
        self.prescan.number_of_external_ps_files
    }

    /// Always true for a loaded file, since loading includes the prescan.
    pub fn prescan_is_performed(&self) -> bool {
        true
    }

    /// The paper size requested by a papersize special, if any page has
    /// one.
    pub fn suggested_page_size(&self) -> Option<PageSize> {
        self.prescan.suggested_page_size
    }

    /// The size of the largest page according to the postamble.
    pub fn max_page_size(&self) -> PageSize {
        PageSize::from_dvi_units(
            self.postamble.max_page_width,
            self.postamble.max_page_height,
            self.cm_per_unit,
        )
    }

    /// How many problems were tolerated while loading. Other software
    /// may bump this while processing the file, for example to stop
    /// reporting errors after a certain number.
    pub fn error_counter(&self) -> u32 {
        self.error_counter
    }

    pub fn record_error(&mut self) {
        self.error_counter = self.error_counter.saturating_add(1);
    }

    /// Whether any page has source specials, until someone takes the
    /// notice. Returns true at most once.
    pub fn take_source_special_notice(&mut self) -> bool {
        std::mem::replace(&mut self.source_special_marker, false)
    }

    pub fn has_pending_source_special_notice(&self) -> bool {
        self.source_special_marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dvi::error::LoadError;
    use crate::dvi::file_writer::DVIFileWriter;

    fn cmr10() -> FontDefinition {
        FontDefinition::new(0, 0x12345678, 655360, 655360, "cmr10".to_string())
    }

    fn counts(page: i32) -> [i32; 10] {
        [page, 0, 0, 0, 0, 0, 0, 0, 0, 0]
    }

    fn document(pages: usize) -> Vec<u8> {
        let mut writer = DVIFileWriter::with_tex_units(b"TeX output");
        writer.set_max_page_size(65536 * 100, 65536 * 200);
        for page in 0..pages {
            writer.begin_page(counts(page as i32 + 1));
            if page == 0 {
                writer.define_font(&cmr10());
            }
            writer.select_font(0);
            writer.push();
            writer.set_char(b'A' + page as u8);
            writer.pop();
            writer.end_page();
        }
        writer.finish()
    }

    #[test]
    fn it_loads_documents() {
        let file = DVIFile::load(document(3)).unwrap();

        assert_eq!(file.total_pages(), 3);
        assert_eq!(file.generator_string(), "TeX output");
        assert_eq!(file.magnification(), 1000);
        assert_eq!(file.error_counter(), 0);
        assert_eq!(file.postamble().max_stack_depth, 1);
        assert_eq!(file.fonts().count(), 1);
        assert!(file.prescan_is_performed());
        assert_eq!(file.filename(), None);

        let offsets = file.page_offsets();
        assert_eq!(offsets[0], 25);
        assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
        let len = file.data().len();
        assert!(offsets.iter().all(|offset| (*offset as usize) < len));
    }

    #[test]
    fn it_computes_the_unit_scale() {
        let file = DVIFile::load(document(1)).unwrap();
        let expected = 5.362851005776948e-7;
        assert!((file.cm_per_dvi_unit() - expected).abs() < expected * 1e-12);

        let size = file.max_page_size();
        assert!((size.width.cm() - 100.0 * 2.54 / 72.27).abs() < 1e-6);
        assert!((size.height.cm() - 200.0 * 2.54 / 72.27).abs() < 1e-6);
    }

    #[test]
    fn it_gives_access_to_pages() {
        let file = DVIFile::load(document(2)).unwrap();

        let first = file.page_range(0).unwrap();
        let second = file.page_range(1).unwrap();
        assert_eq!(first.end, second.start);
        assert_eq!(second.end, file.beginning_of_postamble() as usize);
        assert_eq!(file.page_data(1).unwrap()[0], 139);
        assert_eq!(*file.page_data(0).unwrap().last().unwrap(), 140);

        assert_eq!(
            file.page_offset(2),
            Err(AccessError::PageIndexOutOfRange { index: 2, total: 2 })
        );
        assert!(file.page_range(5).is_err());
    }

    #[test]
    fn it_loads_documents_without_pages() {
        let file = DVIFile::load(document(0)).unwrap();
        assert_eq!(file.total_pages(), 0);
        assert_eq!(file.fonts().count(), 0);
        assert!(file.page_offset(0).is_err());
    }

    #[test]
    fn it_is_idempotent() {
        let data = document(4);
        let first = DVIFile::load(data.clone()).unwrap();
        let second = DVIFile::load(data).unwrap();

        assert_eq!(first.page_offsets(), second.page_offsets());
        assert_eq!(first.font_registry(), second.font_registry());
        assert_eq!(first.error_counter(), second.error_counter());
    }

    #[test]
    fn it_tolerates_undefined_fonts() {
        let mut writer = DVIFileWriter::with_tex_units(b"");
        writer.begin_page(counts(1));
        writer.define_font(&cmr10());
        writer.select_font(0);
        writer.select_font(99);
        writer.set_char(b'x');
        writer.end_page();
        writer.begin_page(counts(2));
        writer.select_font(99);
        writer.end_page();

        let file = DVIFile::load(writer.finish()).unwrap();
        assert_eq!(file.total_pages(), 2);
        assert_eq!(file.error_counter(), 1);
        assert!(file.font_registry().get(99).unwrap().is_placeholder());
    }

    #[test]
    fn it_takes_the_source_special_notice_once() {
        let mut writer = DVIFileWriter::with_tex_units(b"");
        for page in 0..3 {
            writer.begin_page(counts(page));
            writer.special("src:12 main.tex");
            writer.end_page();
        }
        let data = writer.finish();

        let mut file = DVIFile::load(data.clone()).unwrap();
        assert!(file.has_pending_source_special_notice());
        assert!(file.take_source_special_notice());
        assert!(!file.take_source_special_notice());

        let options = LoadOptions::default().source_special_notice(false);
        let mut quiet = DVIFile::load_with_options(data, &options).unwrap();
        assert!(!quiet.take_source_special_notice());
    }

    #[test]
    fn it_counts_postscript_files_and_paper_sizes() {
        let mut writer = DVIFileWriter::with_tex_units(b"");
        writer.begin_page(counts(1));
        writer.special("papersize=210mm,297mm");
        writer.special("psfile=one.eps");
        writer.end_page();
        writer.begin_page(counts(2));
        writer.special("PSfile=two.eps");
        writer.special("\u{1}not a special we know");
        writer.end_page();

        let mut file = DVIFile::load(writer.finish()).unwrap();
        assert_eq!(file.number_of_external_ps_files(), 2);
        assert!(!file.take_source_special_notice());
        let size = file.suggested_page_size().unwrap();
        assert!((size.height.cm() - 29.7).abs() < 1e-9);
    }

    #[test]
    fn it_counts_recorded_errors() {
        let mut file = DVIFile::load(document(1)).unwrap();
        file.record_error();
        file.record_error();
        assert_eq!(file.error_counter(), 2);
    }

    #[test]
    fn it_rejects_zero_denominators() {
        let data = DVIFileWriter::new(1, 0, 1000, b"").finish();
        assert!(matches!(
            DVIFile::load(data),
            Err(LoadError::MalformedHeader(_))
        ));
    }

    #[test]
    fn it_reads_files_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "dvifile-test-{}.dvi",
            std::process::id()
        ));
        fs::write(&path, document(2)).unwrap();

        let file = DVIFile::from_path(&path, &LoadOptions::default()).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(file.total_pages(), 2);
        assert_eq!(file.filename(), Some(path.display().to_string().as_str()));

        assert!(matches!(
            DVIFile::from_path(&path, &LoadOptions::default()),
            Err(LoadError::Io(_))
        ));
    }
}
