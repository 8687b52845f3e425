use std::fs;
use tempfile::tempdir;

use sigframe_cli::commands::receive::{self, ReceiveArgs};
use sigframe_cli::commands::transmit::{self, TransmitArgs};
use sigframe_cli::iq::read_iq;
use sigframe_cli::FrameFamily;
use sigframe_core::{CrcScheme, FecScheme, HeaderFailurePolicy, ModulationScheme, OfdmParams, SyncConfig};

fn transmit_args(family: FrameFamily, frame_size: Option<usize>) -> TransmitArgs {
    TransmitArgs {
        family,
        header: None,
        frame_size,
        props: None,
        crc: CrcScheme::Crc32,
        fec0: FecScheme::None,
        fec1: FecScheme::Hamming128,
        modulation: ModulationScheme::Psk4,
        ofdm: None,
        pad: 64,
    }
}

fn receive_args(family: FrameFamily, output: Option<String>) -> ReceiveArgs {
    ReceiveArgs { family, chunk: 500, sync_config: None, ofdm: None, json: true, output, progress: false }
}

fn payload_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

fn link(family: FrameFamily, data: &[u8], frame_size: Option<usize>) -> (Vec<u8>, sigframe_core::FrameSyncCounters) {
    let td = tempdir().unwrap();
    let in_path = td.path().join("data.bin");
    let iq_path = td.path().join("frames.iq");
    let out_path = td.path().join("payloads.bin");
    fs::write(&in_path, data).unwrap();

    transmit::execute(in_path.to_str().unwrap(), iq_path.to_str().unwrap(), &transmit_args(family, frame_size)).unwrap();
    let counters = receive::execute(
        iq_path.to_str().unwrap(),
        &receive_args(family, Some(out_path.to_str().unwrap().to_string())),
    )
    .unwrap();
    (fs::read(&out_path).unwrap(), counters)
}

#[test]
fn flexframe_link_reassembles_input() {
    let data = payload_data(300);
    let (received, counters) = link(FrameFamily::Flexframe, &data, Some(100));
    assert_eq!(counters.payload_valid, 3);
    assert_eq!(counters.payload_invalid, 0);
    assert_eq!(received, data);
}

#[test]
fn frame64_link_pads_last_frame() {
    let data = payload_data(100);
    let (received, counters) = link(FrameFamily::Frame64, &data, None);
    assert_eq!(counters.payload_valid, 2);
    assert_eq!(received.len(), 128);
    assert_eq!(&received[..100], &data[..]);
    assert!(received[100..].iter().all(|&b| b == 0));
}

#[test]
fn gmsk_link_reassembles_input() {
    let data = payload_data(90);
    let (received, counters) = link(FrameFamily::Gmsk, &data, Some(45));
    assert_eq!(counters.payload_valid, 2);
    assert_eq!(received, data);
}

#[test]
fn ofdm_link_reassembles_input() {
    let data = payload_data(200);
    let (received, counters) = link(FrameFamily::Ofdm, &data, Some(120));
    assert_eq!(counters.payload_valid, 2);
    assert_eq!(received, data);
}

#[test]
fn transmit_writes_whole_frames() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("data.bin");
    let iq_path = td.path().join("frames.iq");
    fs::write(&in_path, payload_data(64)).unwrap();

    let args = TransmitArgs { pad: 10, ..transmit_args(FrameFamily::Frame64, None) };
    transmit::execute(in_path.to_str().unwrap(), iq_path.to_str().unwrap(), &args).unwrap();

    let samples = read_iq(&iq_path).unwrap();
    // 63 preamble + 160 header + 544 payload symbols at 2 samples each
    assert_eq!(samples.len(), 10 + 2 * (63 + 160 + 544) + 10);
    assert!(samples[..10].iter().all(|s| s.norm() == 0.0));
}

#[test]
fn transmit_rejects_oversized_header() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("data.bin");
    let iq_path = td.path().join("frames.iq");
    fs::write(&in_path, b"abc").unwrap();

    let args = TransmitArgs { header: Some("00112233445566778899".into()), ..transmit_args(FrameFamily::Flexframe, None) };
    assert!(transmit::execute(in_path.to_str().unwrap(), iq_path.to_str().unwrap(), &args).is_err());
}

#[test]
fn receive_uses_config_files() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("data.bin");
    let iq_path = td.path().join("frames.iq");
    let ofdm_path = td.path().join("ofdm.json");
    let sync_path = td.path().join("sync.json");
    let out_path = td.path().join("payloads.bin");

    let data = payload_data(40);
    fs::write(&in_path, &data).unwrap();
    let params = OfdmParams::default();
    fs::write(&ofdm_path, serde_json::to_string(&params).unwrap()).unwrap();
    let config = SyncConfig { header_failure: HeaderFailurePolicy::Discard, ..SyncConfig::default() };
    fs::write(&sync_path, serde_json::to_string(&config).unwrap()).unwrap();

    let tx = TransmitArgs { ofdm: Some(ofdm_path.to_str().unwrap().into()), ..transmit_args(FrameFamily::Ofdm, None) };
    transmit::execute(in_path.to_str().unwrap(), iq_path.to_str().unwrap(), &tx).unwrap();

    let rx = ReceiveArgs {
        ofdm: Some(ofdm_path.to_str().unwrap().into()),
        sync_config: Some(sync_path.to_str().unwrap().into()),
        chunk: 1,
        ..receive_args(FrameFamily::Ofdm, Some(out_path.to_str().unwrap().into()))
    };
    let counters = receive::execute(iq_path.to_str().unwrap(), &rx).unwrap();
    assert_eq!(counters.payload_valid, 1);
    assert_eq!(fs::read(&out_path).unwrap(), data);
}

#[test]
fn receive_rejects_truncated_sample_file() {
    let td = tempdir().unwrap();
    let iq_path = td.path().join("bad.iq");
    fs::write(&iq_path, [0u8; 13]).unwrap();
    assert!(receive::execute(iq_path.to_str().unwrap(), &receive_args(FrameFamily::Flexframe, None)).is_err());
}
