//! Basic packetizer and frame generation example

use num_complex::Complex32;
use sigframe_core::{
    CrcScheme, FecScheme, FlexFrameGenerator, FlexFrameSync, FrameCollector, FrameGenerator, FrameProperties,
    ModulationScheme, Packetizer, PacketizerConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Sigframe Basic Encoding Example\n");

    // Protect a message with CRC-32 and Hamming(7,4)
    let message = b"This is a telemetry record";
    let config = PacketizerConfig::new(message.len(), CrcScheme::Crc32, FecScheme::Hamming74, FecScheme::None);
    let mut packetizer = Packetizer::new(config)?;
    let packet = packetizer.encode(message)?;
    println!("{}", packetizer);
    println!("Packet: {} -> {} bytes\n", message.len(), packet.len());

    let decoded = packetizer.decode(&packet)?;
    println!("Decoded '{}' (valid: {})\n", String::from_utf8_lossy(&decoded.message), decoded.valid);

    // Frame five payloads with different modulations
    let mut generator = FlexFrameGenerator::new(FrameProperties::default())?;
    let mut samples = vec![Complex32::new(0.0, 0.0); 64];
    let modulations = [
        ModulationScheme::Psk2,
        ModulationScheme::Psk4,
        ModulationScheme::Psk8,
        ModulationScheme::Qam16,
        ModulationScheme::Qam64,
    ];
    for (i, modulation) in modulations.into_iter().enumerate() {
        let props = FrameProperties { modulation, ..*generator.properties() };
        generator.set_properties(props)?;

        let payload = format!("This is frame {} sent as {}", i, modulation);
        generator.assemble(&(i as u64).to_be_bytes(), payload.as_bytes())?;
        println!("Frame {}: {} bytes -> {} samples", i, payload.len(), generator.frame_len());
        samples.extend(generator.generate());
        samples.extend(vec![Complex32::new(0.0, 0.0); 64]);
    }

    // Receive them back in blocks
    let mut sync = FlexFrameSync::flexframe(FrameCollector::default())?;
    for block in samples.chunks(256) {
        sync.execute(block);
    }

    println!();
    for frame in &sync.listener().frames {
        println!(
            "Received '{}' ({}, payload valid: {})",
            String::from_utf8_lossy(&frame.payload),
            frame.stats.modulation,
            frame.payload_valid
        );
    }
    println!("\n{:?}", sync.counters());

    Ok(())
}
