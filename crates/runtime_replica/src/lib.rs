use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use bus::{ReplicaCommand, ReplicaEvent};
use replica::Replica;

/// Runs the replica on its own thread. Commands are handled one at a time in
/// arrival order until `Shutdown` or until every sender is gone; the replica is
/// handed back through the join handle.
pub fn start_replica_runtime(
    cmd_rx: Receiver<ReplicaCommand>,
    evt_tx: Sender<ReplicaEvent>,
    replica: Replica,
) -> JoinHandle<Replica> {
    thread::spawn(move || {
        let mut replica = replica;
        let mut observers_gone = false;

        while let Ok(cmd) = cmd_rx.recv() {
            let events = match cmd {
                ReplicaCommand::Event(event) => replica.handle_event(event),
                ReplicaCommand::Reset(root) => match replica.reset(&root) {
                    Ok(()) => vec![ReplicaEvent::Reset],
                    Err(err) => {
                        log::error!(target: "mirror.resync", "reset snapshot rejected: {err}");
                        vec![ReplicaEvent::ResyncRequired]
                    }
                },
                ReplicaCommand::Shutdown => {
                    log::debug!(target: "mirror.apply", "replica runtime shutting down");
                    break;
                }
            };
            for event in events {
                if evt_tx.send(event).is_err() && !observers_gone {
                    observers_gone = true;
                    log::debug!(target: "mirror.bus", "no replica observers left");
                }
            }
        }
        replica
    })
}
