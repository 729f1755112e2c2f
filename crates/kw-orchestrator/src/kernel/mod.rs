//! Kernel channel transports

mod zmq;

pub use self::zmq::ZmqConnector;
