use std::{cell::Cell, marker::PhantomData, rc::Rc, sync::mpsc, thread};

mod mirror;
mod worker;

pub use mirror::{Access, Location, Mirrored};
pub use worker::{Arena, DeviceValue, Kernel};

use worker::{BufferId, D2H, H2D};

/// Typed handle to a buffer in one device's arena.
///
/// Plain `Copy` data; the arena entry it names outlives it. Ids are unique
/// across all devices of an `Execution`, so a handle resolves on exactly
/// one device.
pub struct DeviceBuffer<T> {
    id: BufferId,
    device: usize,
    marker: PhantomData<fn() -> T>,
}
impl<T> Clone for DeviceBuffer<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for DeviceBuffer<T> {}
impl<T: 'static> DeviceBuffer<T> {
    /// Resolve the handle inside a kernel
    pub fn get<'a>(&self, arena: &'a Arena) -> &'a T {
        arena
            .get(&self.id)
            .expect("Buffer not allocated on this device")
            .as_any()
            .downcast_ref::<T>()
            .expect("Buffer type mismatch")
    }
    /// Resolve the handle mutably inside a kernel
    pub fn get_mut<'a>(&self, arena: &'a mut Arena) -> &'a mut T {
        arena
            .get_mut(&self.id)
            .expect("Buffer not allocated on this device")
            .as_any_mut()
            .downcast_mut::<T>()
            .expect("Buffer type mismatch")
    }
    /// Whether this handle's buffer lives in the given arena
    pub fn is_resident(&self, arena: &Arena) -> bool {
        arena.contains_key(&self.id)
    }
}

/// One accelerator, modeled as a worker thread owning a buffer arena.
///
/// Commands flow through a FIFO channel, so issue order is completion order.
/// `download` and `synchronize` block the caller and are the only points
/// where the host observes device results.
pub struct Device {
    ordinal: usize,
    tx: mpsc::Sender<H2D>,
    rx: mpsc::Receiver<D2H>,
    next_buffer: Rc<Cell<BufferId>>,
    handle: Option<thread::JoinHandle<()>>,
}
impl Device {
    fn spawn(ordinal: usize, next_buffer: Rc<Cell<BufferId>>) -> Self {
        let (tx, command_rx) = mpsc::channel();
        let (result_tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || worker::run_thread(command_rx, result_tx));
        Self {
            ordinal,
            tx,
            rx,
            next_buffer,
            handle: Some(handle),
        }
    }
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Allocate a device buffer initialized with `value`
    pub fn alloc<T: Send + Clone + 'static>(&self, value: T) -> DeviceBuffer<T> {
        let id = self.next_buffer.get();
        self.next_buffer.set(id + 1);
        self.send(H2D::Alloc(id, Box::new(value)));
        DeviceBuffer {
            id,
            device: self.ordinal,
            marker: PhantomData,
        }
    }
    /// Overwrite a device buffer with fresh host contents
    pub fn upload<T: Send + Clone + 'static>(&self, buffer: DeviceBuffer<T>, value: T) {
        self.check_ownership(buffer.device);
        self.send(H2D::Upload(buffer.id, Box::new(value)));
    }
    /// Copy a device buffer back to the host, blocking until it arrives.
    ///
    /// The FIFO stream makes this a synchronization point: every kernel
    /// queued before the download has run by the time it returns.
    pub fn download<T: Send + Clone + 'static>(&self, buffer: DeviceBuffer<T>) -> T {
        self.check_ownership(buffer.device);
        self.send(H2D::Download(buffer.id));
        match self.recv() {
            D2H::Data(value) => match value.into_any().downcast::<T>() {
                Ok(v) => *v,
                Err(_) => panic!("Downloaded buffer has the wrong type"),
            },
            _ => panic!("Invalid communication"),
        }
    }
    /// Queue a kernel for asynchronous execution
    pub fn enqueue<F>(&self, kernel: F)
    where
        F: FnOnce(&mut Arena) + Send + 'static,
    {
        self.send(H2D::Launch(Box::new(kernel)));
    }
    /// Queue a kernel and wait for it to finish
    pub fn run<F>(&self, kernel: F)
    where
        F: FnOnce(&mut Arena) + Send + 'static,
    {
        self.enqueue(kernel);
        self.synchronize();
    }
    /// Release a device buffer
    pub fn free<T>(&self, buffer: DeviceBuffer<T>) {
        self.check_ownership(buffer.device);
        self.send(H2D::Free(buffer.id));
    }
    /// Block until every queued command has executed
    pub fn synchronize(&self) {
        self.send(H2D::Sync);
        match self.recv() {
            D2H::SyncDone => {}
            _ => panic!("Invalid communication"),
        }
    }

    fn check_ownership(&self, device: usize) {
        assert!(
            device == self.ordinal,
            "Buffer belongs to device {}, not device {}",
            device,
            self.ordinal
        );
    }
    fn send(&self, message: H2D) {
        self.tx.send(message).expect("Disconnect error");
    }
    fn recv(&self) -> D2H {
        self.rx.recv().expect("Disconnect error")
    }
}
impl Drop for Device {
    fn drop(&mut self) {
        // the worker may already be gone if its thread panicked
        let _ = self.tx.send(H2D::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// The devices available to a run.
///
/// With none, everything stays on the host and device acquires panic.
pub struct Execution {
    devices: Vec<Device>,
}
impl Execution {
    /// Host-only execution, no workers spawned
    pub fn host_only() -> Self {
        Self {
            devices: Vec::new(),
        }
    }
    /// Spawn `num_devices` device workers
    pub fn with_devices(num_devices: usize) -> Self {
        let next_buffer = Rc::new(Cell::new(0));
        let devices = (0..num_devices)
            .map(|i| Device::spawn(i, Rc::clone(&next_buffer)))
            .collect();
        Self { devices }
    }

    pub fn num_devices(&self) -> usize {
        self.devices.len()
    }
    pub fn has_devices(&self) -> bool {
        !self.devices.is_empty()
    }
    pub fn device(&self, ordinal: usize) -> &Device {
        assert!(
            ordinal < self.devices.len(),
            "No device {} in an execution with {} devices",
            ordinal,
            self.devices.len()
        );
        &self.devices[ordinal]
    }
    /// The device mirrored buffers pin to
    pub fn default_device(&self) -> &Device {
        assert!(self.has_devices(), "Device access with no devices");
        &self.devices[0]
    }

    /// Queue a kernel on every device
    pub fn broadcast<F>(&self, kernel: F)
    where
        F: Fn(&mut Arena) + Send + Clone + 'static,
    {
        for device in &self.devices {
            device.enqueue(kernel.clone());
        }
    }
    /// Join every device's command stream
    pub fn synchronize(&self) {
        for device in &self.devices {
            device.synchronize();
        }
    }
}
