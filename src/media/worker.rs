//! Hardware worker thread and the camera-backed media source.
//!
//! The worker owns the [`CaptureDevice`] and serves commands from a bounded
//! queue. Frames come back on a capacity-1 channel, so the worker blocks
//! until the previous frame is consumed and the detection loop never sees a
//! stale frame.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError, sync_channel};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::constants::camera::{COMMAND_QUEUE_CAPACITY, EXIT_TIMEOUT_SECS, FRAME_POLL_MS};
use crate::error::{Error, Result};
use crate::media::{CaptureDevice, MediaSource};
use crate::shutdown::Shutdown;
use crate::vision::Frame;

/// Command sent to the hardware worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Start recording to a file and push the first frame.
    Start(PathBuf),
    /// Stop recording and push an end marker.
    Stop,
    /// Push the next frame.
    Capture,
    /// A preview client connected.
    ClientConnect,
    /// A preview client disconnected.
    ClientDisconnect,
    /// Release the hardware and acknowledge.
    Exit,
}

/// Reply pushed by the hardware worker.
#[derive(Debug)]
pub enum FrameReply {
    /// A captured detection frame.
    Frame(Frame),
    /// Recording stopped; no more frames for this episode.
    EndOfStream,
    /// The device failed to serve the last command.
    Failed(String),
    /// The worker released the hardware and is exiting.
    ExitAck,
}

/// Cloneable sender for worker commands.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    commands: SyncSender<WorkerCommand>,
}

impl WorkerHandle {
    /// Queue a command, blocking while the queue is full.
    pub fn send(&self, command: WorkerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::MediaChannelClosed)
    }

    /// Queue a command without blocking. A full queue hands the command back.
    pub fn try_send(&self, command: WorkerCommand) -> Result<Option<WorkerCommand>> {
        match self.commands.try_send(command) {
            Ok(()) => Ok(None),
            Err(TrySendError::Full(command)) => Ok(Some(command)),
            Err(TrySendError::Disconnected(_)) => Err(Error::MediaChannelClosed),
        }
    }

    /// Handle whose commands land on the returned receiver instead of a worker.
    #[cfg(test)]
    pub(crate) fn detached(capacity: usize) -> (Self, Receiver<WorkerCommand>) {
        let (commands, receiver) = sync_channel(capacity);
        (Self { commands }, receiver)
    }
}

struct Worker<D> {
    device: D,
    replies: SyncSender<FrameReply>,
    running: bool,
    recording: bool,
    clients: usize,
}

impl<D: CaptureDevice> Worker<D> {
    fn run(mut self, commands: &Receiver<WorkerCommand>) {
        while let Ok(command) = commands.recv() {
            debug!("Worker command: {command:?}");
            match command {
                WorkerCommand::Start(path) => self.start(&path),
                WorkerCommand::Stop => self.stop(),
                WorkerCommand::Capture => self.capture(),
                WorkerCommand::ClientConnect => self.client_connect(),
                WorkerCommand::ClientDisconnect => self.client_disconnect(),
                WorkerCommand::Exit => {
                    self.release();
                    let _ = self.replies.send(FrameReply::ExitAck);
                    info!("Camera worker exited");
                    return;
                }
            }
        }
        self.release();
    }

    fn reply(&self, reply: FrameReply) {
        if self.replies.send(reply).is_err() {
            debug!("Frame receiver dropped");
        }
    }

    fn ensure_running(&mut self) -> Result<()> {
        if !self.running {
            self.device.start()?;
            self.running = true;
        }
        Ok(())
    }

    fn stop_device_if_idle(&mut self) {
        if self.running && !self.recording && self.clients == 0 {
            if let Err(e) = self.device.stop() {
                warn!("Failed to stop capture device: {e}");
            }
            self.running = false;
        }
    }

    fn start(&mut self, path: &Path) {
        if let Err(e) = self
            .ensure_running()
            .and_then(|()| self.device.start_recording(path))
        {
            error!("Failed to start recording: {e}");
            self.reply(FrameReply::Failed(e.to_string()));
            return;
        }
        self.recording = true;
        info!("Recording to {}", path.display());
        self.capture();
    }

    fn stop(&mut self) {
        if self.recording {
            if let Err(e) = self.device.stop_recording() {
                error!("Failed to finish recording: {e}");
            }
            self.recording = false;
        }
        self.stop_device_if_idle();
        self.reply(FrameReply::EndOfStream);
    }

    fn capture(&mut self) {
        if !self.running {
            self.reply(FrameReply::Failed("capture device is not running".to_string()));
            return;
        }
        let reply = match self.device.capture_frame() {
            Ok(frame) => FrameReply::Frame(frame),
            Err(e) => FrameReply::Failed(e.to_string()),
        };
        self.reply(reply);
    }

    fn client_connect(&mut self) {
        self.clients += 1;
        debug!("Preview clients: {}", self.clients);
        if self.clients == 1 {
            let started = self
                .ensure_running()
                .and_then(|()| self.device.start_preview());
            if let Err(e) = started {
                warn!("Failed to start preview: {e}");
            }
        }
    }

    fn client_disconnect(&mut self) {
        if self.clients == 0 {
            return;
        }
        self.clients -= 1;
        debug!("Preview clients: {}", self.clients);
        if self.clients == 0 {
            if let Err(e) = self.device.stop_preview() {
                warn!("Failed to stop preview: {e}");
            }
            self.stop_device_if_idle();
        }
    }

    fn release(&mut self) {
        if self.recording {
            if let Err(e) = self.device.stop_recording() {
                error!("Failed to finish recording: {e}");
            }
            self.recording = false;
        }
        if self.clients > 0 {
            if let Err(e) = self.device.stop_preview() {
                warn!("Failed to stop preview: {e}");
            }
            self.clients = 0;
        }
        self.stop_device_if_idle();
    }
}

/// Media source backed by a hardware worker thread.
pub struct CameraSource {
    commands: SyncSender<WorkerCommand>,
    replies: Receiver<FrameReply>,
    worker: Option<JoinHandle<()>>,
    pending: Option<Frame>,
    shutdown: Shutdown,
}

impl CameraSource {
    /// Spawn the worker thread that owns `device`.
    pub fn spawn<D>(device: D, shutdown: Shutdown) -> Result<Self>
    where
        D: CaptureDevice + 'static,
    {
        let (commands, command_rx) = sync_channel(COMMAND_QUEUE_CAPACITY);
        let (reply_tx, replies) = sync_channel(1);

        let worker = Worker {
            device,
            replies: reply_tx,
            running: false,
            recording: false,
            clients: 0,
        };
        let handle = std::thread::Builder::new()
            .name("camera-worker".to_string())
            .spawn(move || worker.run(&command_rx))?;

        Ok(Self {
            commands,
            replies,
            worker: Some(handle),
            pending: None,
            shutdown,
        })
    }

    /// Handle for sending preview client events to the worker.
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            commands: self.commands.clone(),
        }
    }

    fn send(&self, command: WorkerCommand) -> Result<()> {
        if self.worker.is_none() {
            return Err(Error::MediaChannelClosed);
        }
        self.commands
            .send(command)
            .map_err(|_| Error::MediaChannelClosed)
    }

    /// Wait for a reply, giving up with `None` once shutdown is requested.
    fn wait_reply(&self) -> Result<Option<FrameReply>> {
        let poll = Duration::from_millis(FRAME_POLL_MS);
        loop {
            if self.shutdown.is_triggered() {
                return Ok(None);
            }
            match self.replies.recv_timeout(poll) {
                Ok(reply) => return Ok(Some(reply)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(Error::MediaChannelClosed),
            }
        }
    }

    /// Wait for a reply matching `wanted`, dropping stale frames from
    /// interrupted captures. Not interrupted by shutdown.
    fn drain_until(&self, wanted: fn(&FrameReply) -> bool, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            match self.replies.recv_timeout(remaining) {
                Ok(reply) if wanted(&reply) => return Ok(true),
                Ok(FrameReply::Failed(reason)) => warn!("Worker reported: {reason}"),
                Ok(other) => debug!("Dropping stale reply {other:?}"),
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => return Err(Error::MediaChannelClosed),
            }
        }
    }

    fn into_frame(reply: Option<FrameReply>) -> Result<Option<Frame>> {
        match reply {
            None | Some(FrameReply::EndOfStream) => Ok(None),
            Some(FrameReply::Frame(frame)) => Ok(Some(frame)),
            Some(FrameReply::Failed(reason)) => Err(Error::MediaDevice { reason }),
            Some(FrameReply::ExitAck) => Err(Error::MediaChannelClosed),
        }
    }
}

impl MediaSource for CameraSource {
    fn start_recording(&mut self, path: &Path) -> Result<()> {
        self.pending = None;
        self.send(WorkerCommand::Start(path.to_path_buf()))?;
        self.pending = Self::into_frame(self.wait_reply()?)?;
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.pending = None;
        self.send(WorkerCommand::Stop)?;
        let timeout = Duration::from_secs(EXIT_TIMEOUT_SECS);
        if !self.drain_until(|r| matches!(r, FrameReply::EndOfStream), timeout)? {
            warn!("Camera worker did not confirm recording stop");
        }
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<Frame>> {
        if let Some(frame) = self.pending.take() {
            return Ok(Some(frame));
        }
        if self.shutdown.is_triggered() {
            return Ok(None);
        }
        self.send(WorkerCommand::Capture)?;
        Self::into_frame(self.wait_reply()?)
    }

    fn close(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.pending = None;
        if self.commands.send(WorkerCommand::Exit).is_err() {
            let _ = worker.join();
            return Ok(());
        }

        let timeout = Duration::from_secs(EXIT_TIMEOUT_SECS);
        if self.drain_until(|r| matches!(r, FrameReply::ExitAck), timeout)? {
            if worker.join().is_err() {
                error!("Camera worker panicked");
            }
            info!("Camera closed");
        } else {
            warn!("Camera worker did not acknowledge exit within {EXIT_TIMEOUT_SECS}s");
        }
        Ok(())
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close camera: {e}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeDevice {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl FakeDevice {
        fn events(&self) -> Vec<&'static str> {
            self.log.lock().unwrap().clone()
        }

        fn push(&self, event: &'static str) {
            self.log.lock().unwrap().push(event);
        }
    }

    impl CaptureDevice for FakeDevice {
        fn start(&mut self) -> Result<()> {
            self.push("start");
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.push("stop");
            Ok(())
        }

        fn start_recording(&mut self, _path: &Path) -> Result<()> {
            self.push("record");
            Ok(())
        }

        fn stop_recording(&mut self) -> Result<()> {
            self.push("finish");
            Ok(())
        }

        fn start_preview(&mut self) -> Result<()> {
            self.push("preview");
            Ok(())
        }

        fn stop_preview(&mut self) -> Result<()> {
            self.push("preview_off");
            Ok(())
        }

        fn capture_frame(&mut self) -> Result<Frame> {
            Ok(Frame::new(RgbImage::new(8, 6)))
        }
    }

    #[test]
    fn test_capture_after_start_yields_frames() {
        let device = FakeDevice::default();
        let mut source = CameraSource::spawn(device.clone(), Shutdown::new()).unwrap();

        source.start_recording(Path::new("/tmp/video.mp4")).unwrap();
        let first = source.capture().unwrap().unwrap();
        assert_eq!((first.width(), first.height()), (8, 6));
        assert!(source.capture().unwrap().is_some());

        source.stop_recording().unwrap();
        source.close().unwrap();

        assert_eq!(device.events(), vec!["start", "record", "finish", "stop"]);
    }

    #[test]
    fn test_capture_without_recording_fails() {
        let mut source = CameraSource::spawn(FakeDevice::default(), Shutdown::new()).unwrap();
        let result = source.capture();
        assert!(matches!(result, Err(Error::MediaDevice { .. })));
    }

    #[test]
    fn test_exit_is_acknowledged() {
        let mut source = CameraSource::spawn(FakeDevice::default(), Shutdown::new()).unwrap();
        source.close().unwrap();
        assert!(source.worker.is_none());
        assert!(matches!(source.capture(), Err(Error::MediaChannelClosed)));
        source.close().unwrap();
    }

    #[test]
    fn test_preview_clients_keep_device_running() {
        let device = FakeDevice::default();
        let mut source = CameraSource::spawn(device.clone(), Shutdown::new()).unwrap();
        let handle = source.handle();

        handle.send(WorkerCommand::ClientConnect).unwrap();
        handle.send(WorkerCommand::ClientConnect).unwrap();
        source.start_recording(Path::new("/tmp/video.mp4")).unwrap();
        source.stop_recording().unwrap();
        assert_eq!(device.events(), vec!["start", "preview", "record", "finish"]);

        handle.send(WorkerCommand::ClientDisconnect).unwrap();
        // Still one client: device keeps streaming.
        handle.send(WorkerCommand::Capture).unwrap();
        assert!(matches!(source.replies.recv().unwrap(), FrameReply::Frame(_)));

        handle.send(WorkerCommand::ClientDisconnect).unwrap();
        assert!(matches!(source.capture(), Err(Error::MediaDevice { .. })));
        assert_eq!(
            device.events(),
            vec!["start", "preview", "record", "finish", "preview_off", "stop"]
        );
    }

    #[test]
    fn test_recording_keeps_device_running_after_last_client() {
        let device = FakeDevice::default();
        let mut source = CameraSource::spawn(device.clone(), Shutdown::new()).unwrap();
        let handle = source.handle();

        handle.send(WorkerCommand::ClientConnect).unwrap();
        source.start_recording(Path::new("/tmp/video.mp4")).unwrap();
        handle.send(WorkerCommand::ClientDisconnect).unwrap();

        assert!(source.capture().unwrap().is_some());
        assert!(source.capture().unwrap().is_some());
        assert!(!device.events().contains(&"stop"));

        source.stop_recording().unwrap();
        assert_eq!(device.events().last(), Some(&"stop"));
    }

    #[test]
    fn test_shutdown_ends_capture() {
        let shutdown = Shutdown::new();
        let mut source = CameraSource::spawn(FakeDevice::default(), shutdown.clone()).unwrap();
        source.start_recording(Path::new("/tmp/video.mp4")).unwrap();
        assert!(source.capture().unwrap().is_some());

        shutdown.trigger();
        assert!(source.capture().unwrap().is_none());
        source.stop_recording().unwrap();
        source.close().unwrap();
    }
}
