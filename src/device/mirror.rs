use std::rc::Rc;

use super::{DeviceBuffer, Execution};

/// Where the authoritative copy of a mirrored value currently lives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    Host,
    Device,
    Both,
}

/// What the caller intends to do with the side it is asking for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// One logical value with a home on the host and one on a device.
///
/// Copies happen only when the requested side is stale: a read from the
/// stale side copies and leaves the value current on both, a write leaves
/// the value current only on the written side. The device home is
/// allocated lazily on device 0 of the execution.
///
/// Invariant: `device.is_none()` implies `location == Host`.
pub struct Mirrored<T: Send + Clone + 'static> {
    host: T,
    device: Option<DeviceBuffer<T>>,
    location: Location,
    exec: Rc<Execution>,
}
impl<T: Send + Clone + 'static> Mirrored<T> {
    /// Wrap a host value; nothing is allocated on the device yet
    pub fn new(value: T, exec: Rc<Execution>) -> Self {
        Self {
            host: value,
            device: None,
            location: Location::Host,
            exec,
        }
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Make the host copy current, downloading if it is stale.
    ///
    /// Blocks until the download lands. A `ReadWrite` access invalidates
    /// the device copy.
    pub fn sync_host(&mut self, access: Access) {
        if self.location == Location::Device {
            let buffer = self.device.expect("Device location with no buffer");
            self.host = self.exec.default_device().download(buffer);
            self.location = Location::Both;
        }
        if access == Access::ReadWrite {
            self.location = Location::Host;
        }
    }
    /// Make the device copy current, allocating or uploading if it is
    /// stale. A `ReadWrite` access invalidates the host copy.
    pub fn sync_device(&mut self, access: Access) {
        assert!(
            self.exec.has_devices(),
            "Device access on a host-only execution"
        );
        match self.device {
            None => {
                self.device = Some(self.exec.default_device().alloc(self.host.clone()));
                self.location = Location::Both;
            }
            Some(buffer) => {
                if self.location == Location::Host {
                    self.exec.default_device().upload(buffer, self.host.clone());
                    self.location = Location::Both;
                }
            }
        }
        if access == Access::ReadWrite {
            self.location = Location::Device;
        }
    }

    /// The host copy; panics if it is stale
    pub fn host_ref(&self) -> &T {
        assert!(
            self.location != Location::Device,
            "Host copy is stale, sync_host first"
        );
        &self.host
    }
    /// The host copy mutably; panics unless the host side is exclusive
    pub fn host_mut(&mut self) -> &mut T {
        assert!(
            self.location == Location::Host,
            "Writable host access requires sync_host(Access::ReadWrite)"
        );
        &mut self.host
    }
    /// Handle to the device copy; panics if it is stale or unallocated
    pub fn device_buffer(&self) -> DeviceBuffer<T> {
        assert!(
            self.location != Location::Host,
            "Device copy is stale, sync_device first"
        );
        self.device.expect("Device buffer not allocated")
    }

    /// Whether the next `sync_host` would copy data
    pub fn host_is_stale(&self) -> bool {
        self.location == Location::Device
    }
    /// Whether the next `sync_device` would copy data
    pub fn device_is_stale(&self) -> bool {
        self.location == Location::Host
    }
}
impl<T: Send + Clone + 'static> Drop for Mirrored<T> {
    fn drop(&mut self) {
        if let Some(buffer) = self.device {
            self.exec.default_device().free(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_host_resident() {
        let exec = Rc::new(Execution::host_only());
        let m = Mirrored::new(vec![1.0f64, 2.0], exec);
        assert_eq!(m.location(), Location::Host);
        assert_eq!(m.host_ref(), &vec![1.0, 2.0]);
    }

    #[test]
    fn read_from_stale_side_lands_in_both() {
        let exec = Rc::new(Execution::with_devices(1));
        let mut m = Mirrored::new(vec![1.0f64, 2.0], Rc::clone(&exec));

        m.sync_device(Access::ReadOnly);
        assert_eq!(m.location(), Location::Both);

        // mutate on the device, making the host stale
        m.sync_device(Access::ReadWrite);
        assert_eq!(m.location(), Location::Device);
        let buffer = m.device_buffer();
        exec.device(0).run(move |arena| {
            buffer.get_mut(arena)[0] = 9.0;
        });

        m.sync_host(Access::ReadOnly);
        assert_eq!(m.location(), Location::Both);
        assert_eq!(m.host_ref(), &vec![9.0, 2.0]);
    }

    #[test]
    fn host_write_invalidates_device_copy() {
        let exec = Rc::new(Execution::with_devices(1));
        let mut m = Mirrored::new(0u32, Rc::clone(&exec));
        m.sync_device(Access::ReadOnly);

        m.sync_host(Access::ReadWrite);
        *m.host_mut() = 5;
        assert_eq!(m.location(), Location::Host);
        assert!(m.device_is_stale());

        // the next device sync uploads the new value
        m.sync_device(Access::ReadOnly);
        let buffer = m.device_buffer();
        assert_eq!(exec.device(0).download(buffer), 5);
    }

    #[test]
    fn sync_is_a_no_op_when_already_current() {
        let exec = Rc::new(Execution::with_devices(1));
        let mut m = Mirrored::new(1.5f64, exec);
        m.sync_host(Access::ReadOnly);
        assert_eq!(m.location(), Location::Host);
        m.sync_device(Access::ReadOnly);
        m.sync_device(Access::ReadOnly);
        assert_eq!(m.location(), Location::Both);
        assert!(!m.host_is_stale());
        assert!(!m.device_is_stale());
    }

    #[test]
    #[should_panic(expected = "Host copy is stale")]
    fn stale_host_read_panics() {
        let exec = Rc::new(Execution::with_devices(1));
        let mut m = Mirrored::new(1u8, exec);
        m.sync_device(Access::ReadWrite);
        m.host_ref();
    }

    #[test]
    #[should_panic(expected = "Device access on a host-only execution")]
    fn device_sync_without_devices_panics() {
        let exec = Rc::new(Execution::host_only());
        let mut m = Mirrored::new(1u8, exec);
        m.sync_device(Access::ReadOnly);
    }
}
