use hypercard_reader::{
    AddColorElement, BlockTag, ImageLayer, MaskedImage, Pixel, ResourceFork, StackError, StackReader,
};
use std::env;
use std::fs;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <path-to-stack> [--password <PASSWORD>] [--no-hack] [--rsrc <RESOURCE_FORK>] [--dump-bitmap <BMAP_ID>]",
            args[0]
        );
        std::process::exit(1);
    }

    let stack_path = &args[1];
    let password = option_value(&args, "--password");
    let hack_encryption = !args.iter().any(|arg| arg == "--no-hack");
    let rsrc_path = option_value(&args, "--rsrc");
    let dump_bitmap = option_value(&args, "--dump-bitmap").map(|value| {
        value.parse::<i32>().unwrap_or_else(|_| {
            eprintln!("ERROR: --dump-bitmap expects a numeric block id, got '{}'", value);
            std::process::exit(1);
        })
    });

    println!("Reading stack: {}", stack_path);
    if password.is_some() {
        println!("Using provided password.");
    }
    println!("{}", "=".repeat(60));

    let reader = match StackReader::new(stack_path, password, hack_encryption) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("\nERROR: Failed to read stack");
            eprintln!("  {}", e);
            if e.is_retryable() {
                eprintln!("  Try again with --password <PASSWORD>.");
            }
            std::process::exit(1);
        }
    };

    let header = &reader.header;
    println!("\nStack Information:");
    println!("  Format: {:?}", header.revision);
    println!("  Private access: {}", header.flags.private_access);
    println!("  User level: {:?}", header.user_level);
    println!("  Card size: {}x{}", header.card_size.width, header.card_size.height);
    if let Some(version) = header.versions.at_creation {
        println!("  Created by HyperCard {}", version);
    }
    if let Some(version) = header.versions.at_last_modification {
        println!("  Last modified by HyperCard {}", version);
    }

    println!("\nStatistics:");
    println!("  Cards: {}", header.card_count);
    println!("  Backgrounds: {}", header.background_count);
    println!("  Pages: {}", reader.page_references().len());
    println!("  Styles: {}", reader.styles().styles.len());
    println!("  Fonts: {}", reader.fonts().fonts.len());

    println!("\nBackgrounds:");
    for background in reader.iter_backgrounds() {
        match background {
            Ok(background) => println!(
                "  [{}] \"{}\" ({} parts, {} cards)",
                background.identifier,
                background.layer.name,
                background.layer.parts.len(),
                background.card_count
            ),
            Err(e) => {
                eprintln!("  ERROR: {}", e);
                break;
            }
        }
    }

    println!("\nSample Cards (first 10):");
    for (i, card) in reader.iter_cards().take(10).enumerate() {
        match card {
            Ok(card) => println!(
                "  {}. [{}] \"{}\" bkgd={} parts={}{}",
                i + 1,
                card.identifier,
                card.layer.name,
                card.background_id,
                card.layer.parts.len(),
                if card.marked { " (marked)" } else { "" }
            ),
            Err(e) => {
                eprintln!("  ERROR: {}", e);
                break;
            }
        }
    }
    if header.card_count > 10 {
        println!("  ... and {} more", header.card_count - 10);
    }

    println!("\nFonts:");
    for font in &reader.fonts().fonts {
        println!("  {} = {}", font.identifier, font.name);
    }

    if let Some(rsrc_path) = rsrc_path {
        match fs::read(rsrc_path)
            .map_err(StackError::from)
            .and_then(|bytes| ResourceFork::from_bytes(bytes))
        {
            Ok(fork) => {
                println!("\nResources:");
                for resource in &fork.resources {
                    println!(
                        "  {} {} \"{}\" ({} bytes)",
                        resource.resource_type,
                        resource.identifier,
                        resource.name,
                        resource.data.len()
                    );
                }
                for resource in fork
                    .resources_of_type(BlockTag::CARD_COLORS)
                    .chain(fork.resources_of_type(BlockTag::BACKGROUND_COLORS))
                {
                    match AddColorElement::parse_all(&resource.data) {
                        Ok(elements) => println!(
                            "  {} {}: {} colored elements",
                            resource.resource_type,
                            resource.identifier,
                            elements.len()
                        ),
                        Err(e) => eprintln!("  {} {}: {}", resource.resource_type, resource.identifier, e),
                    }
                }
            }
            Err(e) => eprintln!("\nERROR: Failed to read resource fork: {}", e),
        }
    }

    if let Some(identifier) = dump_bitmap {
        match reader.bitmap(identifier) {
            Ok(image) => print_image(&image),
            Err(e) => {
                eprintln!("\nERROR: Failed to decode bitmap {}: {}", identifier, e);
                std::process::exit(1);
            }
        }
    }
}

fn option_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let index = args.iter().position(|arg| arg == flag)?;
    match args.get(index + 1) {
        Some(value) => Some(value.as_str()),
        None => {
            eprintln!("ERROR: {} flag requires an argument.", flag);
            std::process::exit(1);
        }
    }
}

/// Prints the picture as text: '#' black, '.' white, ' ' transparent.
fn print_image(image: &MaskedImage) {
    println!("\nBitmap {}x{}:", image.width, image.height);
    if let ImageLayer::Clear = image.image {
        println!("  (no image plane)");
    }
    for y in 0..image.height {
        let row: String = (0..image.width)
            .map(|x| match image.pixel(x, y) {
                Pixel::Black => '#',
                Pixel::White => '.',
                Pixel::Transparent => ' ',
            })
            .collect();
        println!("{}", row.trim_end());
    }
}
