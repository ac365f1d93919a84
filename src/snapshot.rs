//! Snapshot collection and the identity-keyed map persisted across cycles.

use std::collections::HashMap;

use crate::error::FlipResult;
use crate::geometry::{GeometrySnapshot, parse_opacity, parse_scale};
use crate::host::HostEnv;

/// One tracked child: its identity, a non-owning element handle, and the
/// last geometry read for it. Replaced wholesale every cycle, never merged.
#[derive(Clone, Debug)]
pub struct TrackedChild<E> {
    pub identity: String,
    pub element: E,
    pub geometry: GeometrySnapshot,
}

/// Identity → tracked child. Exactly one map is current at any time; the
/// engine replaces it by single assignment at the end of a cycle, so no
/// reader ever sees a half-built map.
pub type SnapshotMap<E> = HashMap<String, TrackedChild<E>>;

/// Read one child's geometry. Pure: one layout read plus two computed-style
/// reads, no writes. Unparsable transform or opacity degrade to identity
/// scale / full opacity rather than failing.
pub fn extract_geometry<H: HostEnv>(
    host: &H,
    el: &H::Element,
    container: &H::Element,
) -> FlipResult<GeometrySnapshot> {
    let offset = host.measure_layout(el, container)?;
    let (scale_x, scale_y) = parse_scale(host.computed_transform(el)?.as_deref());
    let opacity = parse_opacity(host.computed_opacity(el)?.as_deref());
    Ok(GeometrySnapshot {
        top: offset.top,
        left: offset.left,
        opacity,
        scale_x,
        scale_y,
    })
}

/// Build a fresh [`SnapshotMap`] over the host's current children.
///
/// Children without the identity marker are silently skipped (heterogeneous
/// content is expected). Duplicate identities resolve last-seen-wins; keeping
/// them unique is the caller's job. A child whose reads fail keeps its
/// previous geometry (the next cycle self-corrects); one with no previous
/// entry is dropped for this cycle.
pub fn collect_snapshot<H: HostEnv>(
    host: &H,
    identity_attr: &str,
    previous: &SnapshotMap<H::Element>,
) -> SnapshotMap<H::Element> {
    let container = host.container();
    let mut map = SnapshotMap::new();
    for element in host.children() {
        let Some(identity) = host.identity(&element, identity_attr) else {
            continue;
        };
        match extract_geometry(host, &element, &container) {
            Ok(geometry) => {
                map.insert(
                    identity.clone(),
                    TrackedChild {
                        identity,
                        element,
                        geometry,
                    },
                );
            }
            Err(err) => {
                tracing::warn!(%identity, error = %err, "geometry read failed; keeping last known geometry");
                if let Some(prev) = previous.get(&identity) {
                    map.insert(
                        identity.clone(),
                        TrackedChild {
                            identity,
                            element,
                            geometry: prev.geometry,
                        },
                    );
                }
            }
        }
    }
    map
}
