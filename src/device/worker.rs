use std::{any::Any, collections::HashMap, sync::mpsc};

/// A value that can live in a device arena.
///
/// Blanket-implemented for anything clonable and sendable. `clone_value`
/// stands in for the bus transfer when a buffer moves between sides.
pub trait DeviceValue: Any + Send {
    fn clone_value(&self) -> Box<dyn DeviceValue>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}
impl<T: Any + Send + Clone> DeviceValue for T {
    fn clone_value(&self) -> Box<dyn DeviceValue> {
        Box::new(self.clone())
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

pub type BufferId = usize;

/// Buffer storage owned by one device worker, addressed by id
pub type Arena = HashMap<BufferId, Box<dyn DeviceValue>>;

/// Work queued on a device, run with exclusive access to its arena
pub type Kernel = Box<dyn FnOnce(&mut Arena) + Send>;

/// Host-to-Device messages
pub enum H2D {
    Alloc(BufferId, Box<dyn DeviceValue>),
    Upload(BufferId, Box<dyn DeviceValue>),
    Download(BufferId),
    Launch(Kernel),
    Free(BufferId),
    Sync,
    Shutdown,
}

/// Device-to-Host messages
pub enum D2H {
    Data(Box<dyn DeviceValue>),
    SyncDone,
}

/// Command loop run on each device thread.
///
/// Commands execute strictly in the order they were sent, so a `Sync` or
/// `Download` reply proves everything issued before it has finished.
pub(super) fn run_thread(rx: mpsc::Receiver<H2D>, tx: mpsc::Sender<D2H>) {
    let mut arena: Arena = HashMap::new();
    loop {
        let message = rx.recv().expect("Disconnect error");
        match message {
            H2D::Alloc(id, value) | H2D::Upload(id, value) => {
                arena.insert(id, value);
            }
            H2D::Download(id) => {
                let value = arena.get(&id).expect("Download of unallocated buffer");
                tx.send(D2H::Data(value.clone_value()))
                    .expect("Disconnect error");
            }
            H2D::Launch(kernel) => kernel(&mut arena),
            H2D::Free(id) => {
                arena.remove(&id);
            }
            H2D::Sync => tx.send(D2H::SyncDone).expect("Disconnect error"),
            H2D::Shutdown => break,
        }
    }
}
