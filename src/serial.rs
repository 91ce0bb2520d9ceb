//! Serial link to the glove
//!
//! Opens the port with the glove's fixed line settings and turns the byte
//! stream into newline terminated frames.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind};
use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::error::GameError;

pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Something that yields raw frames (one line of bytes, without the newline).
pub trait FrameSource: Send + 'static {
    /// Returns `Ok(None)` when nothing complete arrived before the read timeout.
    fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Splits a byte stream into lines, keeping partial lines across timeouts.
pub struct LineFramer<R> {
    reader: R,
    pending: Vec<u8>,
}

impl<R: BufRead> LineFramer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
        }
    }

    pub fn read_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            // a newline, or end of stream with whatever is left
            Ok(_) if self.pending.is_empty() => Ok(None),
            Ok(_) => {
                let mut frame = std::mem::take(&mut self.pending);
                if frame.last() == Some(&b'\n') {
                    frame.pop();
                }
                Ok(Some(frame))
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<R: BufRead + Send + 'static> FrameSource for LineFramer<R> {
    fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        self.read_frame()
    }
}

/// Line settings for the glove: 8N1, no flow control
#[derive(Debug, Clone)]
pub struct PortSettings {
    pub name: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl PortSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
        }
    }
}

pub type SerialFrames = LineFramer<BufReader<Box<dyn SerialPort>>>;

/// Open the glove's port and wrap it in a line framer
pub fn open_port(settings: &PortSettings) -> Result<SerialFrames, GameError> {
    let port = serialport::new(&settings.name, settings.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(settings.read_timeout)
        .open()?;

    tracing::info!(port = %settings.name, baud = settings.baud_rate, "serial port opened");
    Ok(LineFramer::new(BufReader::new(port)))
}

/// Plays back a captured session, one frame per line, at a fixed pace.
pub struct ReplaySource<R> {
    framer: LineFramer<R>,
    delay: Duration,
}

impl ReplaySource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P, delay: Duration) -> Result<Self, GameError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), delay))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R, delay: Duration) -> Self {
        Self {
            framer: LineFramer::new(reader),
            delay,
        }
    }
}

impl<R: BufRead + Send + 'static> FrameSource for ReplaySource<R> {
    fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        // pacing also keeps an exhausted capture from spinning
        thread::sleep(self.delay);
        self.framer.read_frame()
    }
}

/// Frames pushed through a channel, for driving the game headlessly.
pub struct ChannelSource {
    rx: Receiver<Vec<u8>>,
    timeout: Duration,
}

impl ChannelSource {
    pub fn new(rx: Receiver<Vec<u8>>, timeout: Duration) -> Self {
        Self { rx, timeout }
    }
}

impl FrameSource for ChannelSource {
    fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        match self.rx.recv_timeout(self.timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
                ErrorKind::BrokenPipe,
                "frame channel closed",
            )),
        }
    }
}

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub name: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, manufacturer, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                (Some(usb.vid), Some(usb.pid), usb.manufacturer, usb.product)
            }
            _ => (None, None, None, None),
        };

        Self {
            name: info.port_name,
            vid,
            pid,
            manufacturer,
            product,
        }
    }
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            write!(f, " [{:04x}:{:04x}]", vid, pid)?;
        }
        match (&self.manufacturer, &self.product) {
            (Some(m), Some(p)) => write!(f, " {} {}", m, p),
            (None, Some(p)) => write!(f, " {}", p),
            (Some(m), None) => write!(f, " {}", m),
            (None, None) => Ok(()),
        }
    }
}

/// USB adapters first (ttyACM, then ttyUSB, numerically), then everything else by name
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        return (0, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        return (1, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("COM") {
        return (2, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    (3, 0, basename.to_string())
}

pub fn sort_ports(ports: &mut [PortInfo]) {
    ports.sort_by_key(|p| port_sort_key(&p.name));
}

/// List available serial ports in a stable order
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect();
    sort_ports(&mut ports);
    ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use std::sync::mpsc;

    /// Reader that hands out scripted chunks, with timeouts in between
    struct Scripted {
        chunks: Vec<io::Result<Vec<u8>>>,
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Ok(0);
            }
            match self.chunks.remove(0) {
                Ok(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Err(e) => Err(e),
            }
        }
    }

    fn timeout() -> io::Result<Vec<u8>> {
        Err(io::Error::new(ErrorKind::TimedOut, "timed out"))
    }

    #[test]
    fn test_frames_split_on_newline() {
        let mut framer = LineFramer::new(Cursor::new(b"A,B\nC,I\r\n".to_vec()));
        assert_eq!(framer.read_frame().unwrap(), Some(b"A,B".to_vec()));
        assert_eq!(framer.read_frame().unwrap(), Some(b"C,I\r".to_vec()));
        assert_eq!(framer.read_frame().unwrap(), None);
    }

    #[test]
    fn test_partial_frame_survives_timeout() {
        let reader = Scripted {
            chunks: vec![Ok(b"A,".to_vec()), timeout(), Ok(b"B\n".to_vec())],
        };
        let mut framer = LineFramer::new(BufReader::new(reader));

        assert_eq!(framer.read_frame().unwrap(), None);
        assert_eq!(framer.read_frame().unwrap(), Some(b"A,B".to_vec()));
    }

    #[test]
    fn test_unterminated_tail_is_flushed_at_eof() {
        let mut framer = LineFramer::new(Cursor::new(b"F1,X".to_vec()));
        assert_eq!(framer.read_frame().unwrap(), Some(b"F1,X".to_vec()));
        assert_eq!(framer.read_frame().unwrap(), None);
    }

    #[test]
    fn test_hard_errors_propagate() {
        let reader = Scripted {
            chunks: vec![Err(io::Error::new(ErrorKind::BrokenPipe, "unplugged"))],
        };
        let mut framer = LineFramer::new(BufReader::new(reader));
        assert_eq!(
            framer.read_frame().unwrap_err().kind(),
            ErrorKind::BrokenPipe
        );
    }

    #[test]
    fn test_replay_source_paces_frames() {
        let mut replay = ReplaySource::new(Cursor::new(b"A\nI\n".to_vec()), Duration::ZERO);
        assert_eq!(replay.next_frame().unwrap(), Some(b"A".to_vec()));
        assert_eq!(replay.next_frame().unwrap(), Some(b"I".to_vec()));
        assert_eq!(replay.next_frame().unwrap(), None);
        assert_eq!(replay.next_frame().unwrap(), None);
    }

    #[test]
    fn test_channel_source() {
        let (tx, rx) = mpsc::channel();
        let mut source = ChannelSource::new(rx, Duration::from_millis(5));
        assert_eq!(source.next_frame().unwrap(), None);

        tx.send(b"A,I".to_vec()).unwrap();
        assert_eq!(source.next_frame().unwrap(), Some(b"A,I".to_vec()));

        drop(tx);
        assert!(source.next_frame().is_err());
    }

    #[test]
    fn test_port_sorting() {
        let mut ports: Vec<PortInfo> = [
            "/dev/ttyUSB1",
            "/dev/ttyACM1",
            "/dev/ttyUSB0",
            "/dev/someport",
            "/dev/ttyACM10",
            "COM17",
            "COM3",
        ]
        .into_iter()
        .map(|n| PortInfo {
            name: n.to_string(),
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        })
        .collect();

        sort_ports(&mut ports);
        let names: Vec<&str> = ports.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "/dev/ttyACM1",
                "/dev/ttyACM10",
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "COM3",
                "COM17",
                "/dev/someport",
            ]
        );
    }

    #[test]
    fn test_port_info_display() {
        let port = PortInfo {
            name: "/dev/ttyUSB0".into(),
            vid: Some(0x1a86),
            pid: Some(0x7523),
            manufacturer: None,
            product: Some("USB Serial".into()),
        };
        assert_eq!(port.to_string(), "/dev/ttyUSB0 [1a86:7523] USB Serial");
    }

    #[test]
    fn test_default_port_settings() {
        let settings = PortSettings::new("COM17");
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.read_timeout, Duration::from_secs(1));
    }
}
