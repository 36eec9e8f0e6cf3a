use std::env;
use std::process;

use dvifile::{DVIFile, LoadOptions};

fn main() {
    let mut args = env::args().skip(1).collect::<Vec<String>>();

    if args.len() != 1 {
        eprintln!("usage: print_dvi <file.dvi>");
        process::exit(2);
    }

    let filename = args.pop().unwrap_or_default();
    let mut dvi = match DVIFile::from_path(&filename, &LoadOptions::default()) {
        Ok(dvi) => dvi,
        Err(err) => {
            eprintln!("cannot open {}: {}", filename, err);
            process::exit(1);
        }
    };

    println!("generator: {}", dvi.generator_string());
    println!("pages: {}", dvi.total_pages());
    println!("cm per DVI unit: {:e}", dvi.cm_per_dvi_unit());
    let max_size = dvi.max_page_size();
    println!(
        "largest page: {:.2}cm x {:.2}cm",
        max_size.width.cm(),
        max_size.height.cm()
    );
    if let Some(size) = dvi.suggested_page_size() {
        println!(
            "paper size: {:.1}mm x {:.1}mm",
            size.width.mm(),
            size.height.mm()
        );
    }

    for (page, offset) in dvi.page_offsets().iter().enumerate() {
        println!("page {} at {}", page + 1, offset);
    }
    for font in dvi.fonts() {
        if font.is_placeholder() {
            println!("font {}: undefined", font.font_num);
        } else {
            println!(
                "font {}: {} scaled {:.3} (checksum {:#010x})",
                font.font_num,
                font.font_name,
                font.enlargement(dvi.magnification()),
                font.checksum
            );
        }
    }

    println!("PostScript files: {}", dvi.number_of_external_ps_files());
    if dvi.take_source_special_notice() {
        println!("this file contains source specials");
    }
    if dvi.error_counter() > 0 {
        println!("{} issues were found while loading", dvi.error_counter());
    }
}
