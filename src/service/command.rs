//! Messages processed by the cluster service task

use tokio::sync::oneshot;

use crate::health::NodeHealthRecord;
use crate::registry::{AddReport, ClientKey, ClusterKey, ConnectionOptions};

/// A mutation for the service to apply
///
/// `reply` is `None` for fire-and-forget health signals.
#[derive(Debug)]
pub(crate) enum Command {
    AddNodes {
        cluster_key: ClusterKey,
        endpoints: Vec<ClientKey>,
        shared_options: ConnectionOptions,
        reply: oneshot::Sender<AddReport>,
    },
    MarkDown {
        node: String,
        reply: Option<oneshot::Sender<NodeHealthRecord>>,
    },
    MarkUp {
        node: String,
        reply: Option<oneshot::Sender<bool>>,
    },
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::AddNodes { .. } => "add_nodes",
            Self::MarkDown { .. } => "mark_down",
            Self::MarkUp { .. } => "mark_up",
        }
    }
}
