/// Recognizes the few kinds of \special this loader cares about while
/// prescanning pages. Nothing here interprets the specials, it only decides
/// what they are.
use crate::page_size::{Length, PageSize};

#[derive(Debug, Clone, PartialEq)]
pub enum Special {
    /// An external PostScript file, e.g. `psfile=figure.eps hscale=50`.
    PostScriptFile,
    /// A source-correlation marker such as `src:42 chapter.tex`.
    Source,
    /// `papersize=<width>,<height>` as written by dvips-aware packages.
    PaperSize(PageSize),
    Other,
}

/// A papersize special that could not be read. Counted as an anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedSpecial(pub String);

pub fn classify(special: &str) -> Result<Special, MalformedSpecial> {
    let trimmed = special.trim_start();

    if has_prefix_ignore_case(trimmed, "psfile=") {
        return Ok(Special::PostScriptFile);
    }
    if trimmed.starts_with("src:") {
        return Ok(Special::Source);
    }
    if let Some(size) = trimmed.strip_prefix("papersize=") {
        return parse_paper_size(size)
            .map(Special::PaperSize)
            .ok_or_else(|| MalformedSpecial(special.to_string()));
    }

    Ok(Special::Other)
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn parse_paper_size(size: &str) -> Option<PageSize> {
    let mut parts = size.trim().splitn(2, ',');
    let width = Length::parse(parts.next()?)?;
    let height = Length::parse(parts.next()?)?;
    Some(PageSize::new(width, height))
}
