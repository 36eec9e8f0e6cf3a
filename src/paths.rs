/// Locating font files for the fonts a DVI file names.
use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

struct FontLookup {
    // None until kpathsea has been set up. If setting it up fails we keep
    // None and try again on the next lookup.
    kpse: Option<kpathsea::Kpaths>,
    found: HashMap<String, Option<String>>,
}

lazy_static! {
    // The kpathsea library isn't thread-safe, so every lookup goes through
    // this mutex. Results are remembered since the same handful of fonts is
    // asked for over and over while pages render on different threads.
    static ref FONT_LOOKUP: Mutex<FontLookup> = Mutex::new(FontLookup {
        kpse: None,
        found: HashMap::new(),
    });
}

/// Given a font file name (like "cmr10.tfm"), returns a path to the file if
/// it can be found.
pub fn get_path_to_font(font_file_name: &str) -> Option<String> {
    let mut lookup = match FONT_LOOKUP.lock() {
        Ok(lookup) => lookup,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(found) = lookup.found.get(font_file_name) {
        return found.clone();
    }

    if lookup.kpse.is_none() {
        match kpathsea::Kpaths::new() {
            Ok(kpse) => lookup.kpse = Some(kpse),
            // If we can't initialize kpathsea successfully, just say we
            // couldn't find the font.
            Err(_) => {
                debug!(
                    "kpathsea is unavailable, cannot look up {}",
                    font_file_name
                );
                return None;
            }
        }
    }

    let result = lookup
        .kpse
        .as_ref()
        .and_then(|kpse| kpse.find_file(font_file_name));
    debug!("{} resolved to {:?}", font_file_name, result);
    lookup
        .found
        .insert(font_file_name.to_string(), result.clone());
    result
}
