use anyhow::Result;
use colored::*;
use sigframe_core::{CrcScheme, FecScheme, ModulationScheme};

fn mark(supported: bool) -> ColoredString {
    if supported {
        "✓".green()
    } else {
        "✗".red()
    }
}

pub fn execute() -> Result<()> {
    println!("\n=== Error detection ===");
    for crc in CrcScheme::all().filter(|c| *c != CrcScheme::Unknown) {
        println!("  {:<10} {:>2} key bytes  {}", crc.name(), crc.key_len(), crc.description());
    }

    println!("\n=== Forward error correction ===");
    for fec in FecScheme::all().filter(|f| *f != FecScheme::Unknown) {
        println!(
            "  {} {:<10} rate {:.3}  {}",
            mark(fec.is_supported()),
            fec.name(),
            fec.rate(),
            fec.description()
        );
    }

    println!("\n=== Modulation ===");
    for modulation in ModulationScheme::all().filter(|m| *m != ModulationScheme::Unknown) {
        println!(
            "  {:<8} {} bits/symbol  {}",
            modulation.name(),
            modulation.bits_per_symbol(),
            modulation.description()
        );
    }
    println!();

    Ok(())
}
