//! UDP receiver for the real-time tracking protocol.
//!
//! One worker task owns the socket between `start` and `stop`, decodes every
//! datagram into an [`RttrpmMessage`] and fans it out to two disjoint
//! listener lists: realtime listeners run synchronously on the worker (the
//! path protocol bridges take, where every millisecond of latency shows),
//! queued listeners run on a separate pump task behind a message queue (the
//! path UI-grade consumers take). For any one packet every realtime listener
//! observes it strictly before the first queued listener does.

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use tokio::{
    net::UdpSocket,
    sync::{mpsc, watch},
    task::JoinHandle,
    time::timeout,
};

use codec::RttrpmMessage;

use crate::statistics::{Statistics, Stats};

const READ_BUFFER_SIZE: usize = 512;
const READ_TIMEOUT: Duration = Duration::from_millis(100);
const STOP_BUDGET: Duration = Duration::from_secs(4);

/// Receives decoded tracking messages from the receiver, together with the
/// datagram's sender address.
pub trait PacketListener: Send + Sync {
    fn packet_received(&self, message: &RttrpmMessage, source: SocketAddr);
}

#[derive(Default)]
struct Listeners {
    realtime: RwLock<Vec<Arc<dyn PacketListener>>>,
    queued: RwLock<Vec<Arc<dyn PacketListener>>>,
}

struct Running {
    stop: watch::Sender<bool>,
    worker: JoinHandle<()>,
    pump: JoinHandle<()>,
    local_addr: SocketAddr,
}

pub struct RttrpmReceiver {
    port: u16,
    listeners: Arc<Listeners>,
    statistics: Statistics,
    running: Mutex<Option<Running>>,
}

impl RttrpmReceiver {
    pub fn new(port: u16, statistics: Statistics) -> Self {
        Self {
            port,
            listeners: Arc::new(Listeners::default()),
            statistics,
            running: Mutex::new(None),
        }
    }

    /// Binds the socket on all local addresses and spawns the worker and the
    /// queued-delivery pump. A bind failure leaves nothing running. Calling
    /// `start` on a running receiver restarts it.
    pub async fn start(&self) -> Result<()> {
        self.stop().await;

        let socket =
            UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))).await?;
        let local_addr = socket.local_addr()?;

        log::info!("rttrpm receiver listening, port={}", local_addr.port());

        let (stop, mut stop_signal) = watch::channel(false);
        let (queue, mut queue_receiver) =
            mpsc::unbounded_channel::<(RttrpmMessage, SocketAddr)>();

        let worker = {
            let listeners = self.listeners.clone();
            let statistics = self.statistics.clone();

            tokio::spawn(async move {
                let mut buffer = [0u8; READ_BUFFER_SIZE];

                loop {
                    if *stop_signal.borrow() {
                        break;
                    }

                    // the timeout doubles as the stop-flag poll interval, so
                    // a shutdown without traffic is never stuck in the read
                    let received = tokio::select! {
                        _ = stop_signal.changed() => break,
                        received = timeout(READ_TIMEOUT, socket.recv_from(&mut buffer)) => received,
                    };

                    let Ok(received) = received else {
                        continue;
                    };

                    let (size, source) = match received {
                        Ok(it) => it,
                        Err(e) => {
                            log::error!("rttrpm receiver read error={e}");
                            statistics.add(Stats::ErrorPkts(1));

                            break;
                        }
                    };

                    statistics.add(Stats::ReceivedBytes(size));
                    statistics.add(Stats::ReceivedPkts(1));

                    if size < 4 {
                        statistics.add(Stats::DroppedPkts(1));
                        continue;
                    }

                    let message = codec::decode(&buffer[..size]);
                    if message.modules.is_empty() {
                        statistics.add(Stats::DroppedPkts(1));
                        continue;
                    }

                    let realtime: Vec<_> = listeners.realtime.read().clone();
                    for listener in realtime {
                        listener.packet_received(&message, source);
                    }

                    if !listeners.queued.read().is_empty() {
                        let _ = queue.send((message, source));
                    }
                }

                // the queue sender drops here, which ends the pump once the
                // already queued messages have been drained
            })
        };

        let pump = {
            let listeners = self.listeners.clone();

            tokio::spawn(async move {
                while let Some((message, source)) = queue_receiver.recv().await {
                    let queued: Vec<_> = listeners.queued.read().clone();
                    for listener in queued {
                        listener.packet_received(&message, source);
                    }
                }
            })
        };

        *self.running.lock() = Some(Running {
            stop,
            worker,
            pump,
            local_addr,
        });

        Ok(())
    }

    /// Signals the worker, joins it within the stop budget and then waits
    /// for the pump to drain. After `stop` returns no further listener
    /// invocations occur. Idempotent.
    pub async fn stop(&self) {
        let Some(Running {
            stop, worker, pump, ..
        }) = self.running.lock().take()
        else {
            return;
        };

        let _ = stop.send(true);

        let mut worker = worker;
        if timeout(STOP_BUDGET, &mut worker).await.is_err() {
            log::warn!("rttrpm receiver worker did not stop within budget, aborting it");
            worker.abort();
        }

        let _ = pump.await;
    }

    /// The bound socket address while running, e.g. to learn the actual port
    /// after binding port zero.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|running| running.local_addr)
    }

    pub fn add_realtime_listener(&self, listener: Arc<dyn PacketListener>) {
        self.listeners.realtime.write().push(listener);
    }

    pub fn add_listener(&self, listener: Arc<dyn PacketListener>) {
        self.listeners.queued.write().push(listener);
    }

    pub fn remove_realtime_listener(&self, listener: &Arc<dyn PacketListener>) {
        self.listeners
            .realtime
            .write()
            .retain(|it| !Arc::ptr_eq(it, listener));
    }

    pub fn remove_listener(&self, listener: &Arc<dyn PacketListener>) {
        self.listeners
            .queued
            .write()
            .retain(|it| !Arc::ptr_eq(it, listener));
    }
}
