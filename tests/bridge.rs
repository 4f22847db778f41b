use std::{
    net::UdpSocket,
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::{BufMut, BytesMut};

use showbridge::{
    processor::{MessageListener, RttrpmProcessorOptions, RttrpmProtocolProcessor},
    receiver::{PacketListener, RttrpmReceiver},
    statistics::Statistics,
};

use engine::object::{Address, ProtocolId, RemoteObjectId, RemoteObjectMessage, Value};

/// Builds a big-endian RTTrPM datagram with one trackable carrying one
/// tracked point position.
fn position_packet(name: &str, x: f64, y: f64) -> Vec<u8> {
    let mut buf = BytesMut::new();

    // header
    buf.put_u16(0x4154);
    buf.put_u16(0x4334);
    buf.put_u16(0x0002);
    buf.put_u32(1); // packet id
    buf.put_u8(0x00); // raw format
    buf.put_u16(0); // patched below
    buf.put_u32(0); // user context
    buf.put_u8(1); // one trackable

    // trackable
    buf.put_u8(0x01);
    buf.put_u16((1 + 2 + 1 + name.len() + 4 + 1) as u16);
    buf.put_u8(name.len() as u8);
    buf.put_slice(name.as_bytes());
    buf.put_u32(1); // sequence number
    buf.put_u8(1); // one sub-module

    // tracked point position
    buf.put_u8(0x06);
    buf.put_u16(30);
    buf.put_u16(0); // latency
    buf.put_f64(x);
    buf.put_f64(y);
    buf.put_f64(0.0);
    buf.put_u8(0); // point index

    let size = buf.len() as u16;
    buf[11..13].copy_from_slice(&size.to_be_bytes());

    buf.to_vec()
}

#[derive(Default)]
struct RecordingNode {
    received: Mutex<Vec<(ProtocolId, RemoteObjectId, RemoteObjectMessage)>>,
}

impl RecordingNode {
    fn received(&self) -> Vec<(ProtocolId, RemoteObjectId, RemoteObjectMessage)> {
        self.received.lock().unwrap().clone()
    }
}

impl MessageListener for RecordingNode {
    fn on_protocol_message_received(
        &self,
        protocol: ProtocolId,
        id: RemoteObjectId,
        message: RemoteObjectMessage,
    ) {
        self.received.lock().unwrap().push((protocol, id, message));
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if condition() {
            return true;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    condition()
}

fn send_to_port(port: u16, payload: &[u8]) {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.send_to(payload, ("127.0.0.1", port)).unwrap();
}

#[tokio::test]
async fn tracked_point_position_reaches_the_node() {
    let node = Arc::new(RecordingNode::default());
    let processor = RttrpmProtocolProcessor::new(
        RttrpmProcessorOptions {
            protocol_id: 1,
            port: 0,
            mapping_area: 2,
            expected_sender: None,
        },
        Statistics::default(),
        node.clone(),
    );

    processor.start().await.unwrap();
    let port = processor.local_addr().unwrap().port();

    send_to_port(port, &position_packet("7", 0.25, 0.75));

    assert!(wait_until(|| !node.received().is_empty()).await);

    let received = node.received();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0],
        (
            1,
            RemoteObjectId::CoordMappingPositionXy,
            RemoteObjectMessage::new(Address::new(7, 2), Value::Float(vec![0.25, 0.75])),
        )
    );

    processor.stop().await;
}

#[tokio::test]
async fn sentinel_mapping_area_selects_the_absolute_object() {
    let node = Arc::new(RecordingNode::default());
    let processor = RttrpmProtocolProcessor::new(
        RttrpmProcessorOptions {
            protocol_id: 1,
            port: 0,
            mapping_area: -1,
            expected_sender: None,
        },
        Statistics::default(),
        node.clone(),
    );

    processor.start().await.unwrap();
    let port = processor.local_addr().unwrap().port();

    send_to_port(port, &position_packet("3", 0.5, 0.5));

    assert!(wait_until(|| !node.received().is_empty()).await);

    let (_, id, message) = node.received().pop().unwrap();
    assert_eq!(id, RemoteObjectId::PositioningPositionXy);
    assert_eq!(message.address, Address::new(3, -1));

    processor.stop().await;
}

#[tokio::test]
async fn sender_filter_drops_foreign_packets() {
    let node = Arc::new(RecordingNode::default());
    let processor = RttrpmProtocolProcessor::new(
        RttrpmProcessorOptions {
            protocol_id: 1,
            port: 0,
            mapping_area: 2,
            expected_sender: Some("10.0.0.5".parse().unwrap()),
        },
        Statistics::default(),
        node.clone(),
    );

    processor.start().await.unwrap();
    let port = processor.local_addr().unwrap().port();

    send_to_port(port, &position_packet("7", 0.25, 0.75));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(node.received().is_empty());

    processor.stop().await;
}

#[tokio::test]
async fn muted_objects_are_dropped_until_unmuted() {
    let node = Arc::new(RecordingNode::default());
    let processor = RttrpmProtocolProcessor::new(
        RttrpmProcessorOptions {
            protocol_id: 1,
            port: 0,
            mapping_area: 2,
            expected_sender: None,
        },
        Statistics::default(),
        node.clone(),
    );

    let muted_address = Address::new(7, 2);
    processor.set_object_muted(RemoteObjectId::CoordMappingPositionXy, muted_address, true);
    assert!(processor.is_object_muted(RemoteObjectId::CoordMappingPositionXy, muted_address));

    processor.start().await.unwrap();
    let port = processor.local_addr().unwrap().port();

    send_to_port(port, &position_packet("7", 0.25, 0.75));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(node.received().is_empty());

    processor.set_object_muted(RemoteObjectId::CoordMappingPositionXy, muted_address, false);
    send_to_port(port, &position_packet("7", 0.25, 0.75));

    assert!(wait_until(|| !node.received().is_empty()).await);

    processor.stop().await;
}

struct LabelListener {
    label: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
}

impl PacketListener for LabelListener {
    fn packet_received(&self, _message: &codec::RttrpmMessage, _source: std::net::SocketAddr) {
        self.order.lock().unwrap().push(self.label);
    }
}

#[tokio::test]
async fn realtime_listeners_run_before_queued_listeners() {
    let receiver = RttrpmReceiver::new(0, Statistics::default());
    let order = Arc::new(Mutex::new(Vec::new()));

    receiver.add_listener(Arc::new(LabelListener {
        label: "queued",
        order: order.clone(),
    }));
    receiver.add_realtime_listener(Arc::new(LabelListener {
        label: "realtime",
        order: order.clone(),
    }));

    receiver.start().await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    send_to_port(port, &position_packet("1", 0.1, 0.2));

    assert!(wait_until(|| order.lock().unwrap().len() == 2).await);
    assert_eq!(*order.lock().unwrap(), vec!["realtime", "queued"]);

    receiver.stop().await;
}

#[tokio::test]
async fn no_listener_invocations_after_stop() {
    let receiver = RttrpmReceiver::new(0, Statistics::default());
    let order = Arc::new(Mutex::new(Vec::new()));

    receiver.add_realtime_listener(Arc::new(LabelListener {
        label: "realtime",
        order: order.clone(),
    }));
    receiver.add_listener(Arc::new(LabelListener {
        label: "queued",
        order: order.clone(),
    }));

    receiver.start().await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    receiver.stop().await;
    // stopping twice is a no-op
    receiver.stop().await;

    send_to_port(port, &position_packet("1", 0.1, 0.2));
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(order.lock().unwrap().is_empty());
}

#[tokio::test]
async fn bind_failure_leaves_nothing_running() {
    let taken = UdpSocket::bind("0.0.0.0:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let receiver = RttrpmReceiver::new(port, Statistics::default());

    assert!(receiver.start().await.is_err());
    assert!(receiver.local_addr().is_none());
}

#[tokio::test]
async fn receiver_counts_traffic() {
    let statistics = Statistics::default();
    let receiver = RttrpmReceiver::new(0, statistics.clone());

    receiver.start().await.unwrap();
    let port = receiver.local_addr().unwrap().port();

    send_to_port(port, &position_packet("5", 0.3, 0.4));
    // an empty-decoding datagram counts as received but dropped
    send_to_port(port, &[0xde, 0xad, 0xbe, 0xef, 0x00]);

    assert!(wait_until(|| statistics.get().received_pkts == 2).await);
    assert!(wait_until(|| statistics.get().dropped_pkts == 1).await);

    receiver.stop().await;
}
