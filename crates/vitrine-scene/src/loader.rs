//! Model loading through the Bevy asset server

use bevy::asset::{LoadState, RecursiveDependencyLoadState};
use bevy::ecs::system::SystemParam;
use bevy::gltf::{Gltf, GltfMesh, GltfNode};
use bevy::prelude::*;
use vitrine_core::{LoadEvent, LoadProgress, LoadTicket};

use crate::convert::{decode_gltf, GltfSources};
use crate::host::BevyHost;
use crate::viewport::Viewport;

/// The single in-flight decode, plus the asset kept alive while mounted
#[derive(Resource, Default)]
pub struct PendingLoads {
    pub in_flight: Option<InFlightLoad>,
    pub retained: Option<Handle<Gltf>>,
}

pub struct InFlightLoad {
    pub ticket: LoadTicket,
    pub url: String,
    pub handle: Handle<Gltf>,
    pub reported: LoadProgress,
}

/// Where a glTF load stands
#[derive(Debug, Clone, PartialEq)]
pub enum LoadPhase {
    Pending,
    /// Document parsed; buffers and textures still arriving
    RootLoaded,
    Complete,
    Failed(String),
}

impl LoadPhase {
    pub fn from_states(root: &LoadState, recursive: &RecursiveDependencyLoadState) -> Self {
        match (root, recursive) {
            (LoadState::Failed(err), _) => LoadPhase::Failed(err.to_string()),
            (_, RecursiveDependencyLoadState::Failed(err)) => LoadPhase::Failed(err.to_string()),
            (LoadState::Loaded, RecursiveDependencyLoadState::Loaded) => LoadPhase::Complete,
            (LoadState::Loaded, _) => LoadPhase::RootLoaded,
            _ => LoadPhase::Pending,
        }
    }

    pub fn progress(&self) -> LoadProgress {
        match self {
            LoadPhase::Pending | LoadPhase::Failed(_) => LoadProgress::ZERO,
            LoadPhase::RootLoaded => LoadProgress::from_percent(50.0),
            LoadPhase::Complete => LoadProgress::COMPLETE,
        }
    }
}

#[derive(SystemParam)]
pub struct GltfAssets<'w> {
    pub gltfs: Res<'w, Assets<Gltf>>,
    pub nodes: Res<'w, Assets<GltfNode>>,
    pub gltf_meshes: Res<'w, Assets<GltfMesh>>,
}

/// Turn asset server state into load events for the controller
pub fn poll_model_loads(mut viewport: ResMut<Viewport>, mut host: BevyHost, gltf_assets: GltfAssets) {
    let Some(load) = host.loads.in_flight.as_mut() else {
        return;
    };
    let ticket = load.ticket;

    let phase = match host.asset_server.get_load_states(load.handle.id()) {
        Some((root, _, recursive)) => LoadPhase::from_states(&root, &recursive),
        None => LoadPhase::Pending,
    };

    let progress = phase.progress();
    let event = match phase {
        LoadPhase::Pending | LoadPhase::RootLoaded => {
            if progress <= load.reported {
                return;
            }
            load.reported = progress;
            LoadEvent::Progress(progress)
        }
        LoadPhase::Failed(reason) => {
            host.loads.in_flight = None;
            LoadEvent::Failed(reason)
        }
        LoadPhase::Complete => {
            let Some(gltf) = gltf_assets.gltfs.get(&load.handle) else {
                return;
            };
            let sources = GltfSources {
                nodes: &gltf_assets.nodes,
                gltf_meshes: &gltf_assets.gltf_meshes,
                meshes: &host.meshes,
            };
            host.primitives.clear();
            let decoded = decode_gltf(gltf, &sources, &mut host.primitives);
            tracing::debug!(url = %load.url, meshes = decoded.mesh_count(), "Decoded glTF");

            host.loads.retained = host.loads.in_flight.take().map(|load| load.handle);
            LoadEvent::Loaded(decoded)
        }
    };

    if let Err(err) = viewport.controller_mut().handle_load_event(ticket, event, &mut host) {
        tracing::debug!(%err, "Load event not applied");
    }
}
