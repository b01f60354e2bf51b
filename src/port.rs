use tracing::debug;

/// Host side of the `IN`/`OUT` instructions.
///
/// Calls are synchronous; an implementation may block, the engine waits.
pub trait Ports {
    fn read_port(&mut self, port: u8) -> u8;
    fn write_port(&mut self, port: u8, value: u8);
}

/// No devices attached. Reads yield 0 and writes are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPorts;

impl Ports for NullPorts {
    fn read_port(&mut self, port: u8) -> u8 {
        debug!(port, "read from unconnected port");
        0
    }

    fn write_port(&mut self, port: u8, value: u8) {
        debug!(port, value, "write to unconnected port");
    }
}

impl<P: Ports + ?Sized> Ports for &mut P {
    fn read_port(&mut self, port: u8) -> u8 {
        (**self).read_port(port)
    }

    fn write_port(&mut self, port: u8, value: u8) {
        (**self).write_port(port, value)
    }
}
