//! Shared wiring for crate-internal tests: a fully assembled pipeline over
//! a recording fake transport.

use std::sync::Arc;

use crate::broker::testing::FakePublisher;
use crate::broker::{ConnectionManager, ConnectionState};
use crate::config::TopicConfig;
use crate::notify::ForwardingFlag;
use crate::pipeline::ForwardingPipeline;
use crate::surface::StateSurface;

pub(crate) struct TestRig {
    pub(crate) publisher: Arc<FakePublisher>,
    pub(crate) manager: Arc<ConnectionManager>,
    pub(crate) flag: ForwardingFlag,
    pub(crate) surface: StateSurface,
    pub(crate) pipeline: Arc<ForwardingPipeline>,
}

impl TestRig {
    pub(crate) fn disconnected() -> Self {
        let publisher = Arc::new(FakePublisher::default());
        let manager = Arc::new(ConnectionManager::with_fake(publisher.clone()));
        let flag = ForwardingFlag::new(false);
        let surface = StateSurface::new(manager.monitor(), flag.clone());
        let pipeline = Arc::new(ForwardingPipeline::new(
            manager.clone(),
            TopicConfig::default(),
            surface.clone(),
        ));
        Self {
            publisher,
            manager,
            flag,
            surface,
            pipeline,
        }
    }

    pub(crate) fn connected() -> Self {
        let rig = Self::disconnected();
        rig.manager.force_state(ConnectionState::Connected);
        rig
    }
}
