//! Resolution of absolute, relative and join placements.
//!
//! Constraints are applied in dependency order: a constraint fires once one of
//! its sides is fixed, and constraints whose sides are both fixed are checked.

use indexmap::{IndexMap, IndexSet};
use lumengeom::orientation::{angles_match, Orientation};
use lumengeom::transform::{Transform, Transformation};
use lumengeom::Point;
use serde::{Deserialize, Serialize};

use super::cell::Instance;
use super::port::Port;
use crate::circuit::port_id::PortRef;
use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, Result};
use crate::log::debug;

/// Tolerance in degrees when checking that two joined ports face each other.
const ANGLE_TOLERANCE: f64 = 1e-6;

/// A placement constraint for a child instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaceSpec {
    /// Places an instance at an absolute position.
    ///
    /// Mirrors are applied about the instance origin, before rotation.
    Place {
        inst: ArcStr,
        position: Point,
        angle: f64,
        flip_h: bool,
        flip_v: bool,
    },
    /// Places the instance owning `port` so that `port` sits at `target` plus `offset`.
    ///
    /// `angle`, if given, is the rotation of the placed instance.
    PlaceRelative {
        port: PortRef,
        target: PortRef,
        offset: Point,
        angle: Option<f64>,
    },
    /// Aligns two ports so that they coincide and face each other.
    Join(PortRef, PortRef),
}

impl PlaceSpec {
    /// An absolute placement without rotation or mirroring.
    pub fn place(inst: impl Into<ArcStr>, position: impl Into<Point>) -> Self {
        Self::Place {
            inst: inst.into(),
            position: position.into(),
            angle: 0.,
            flip_h: false,
            flip_v: false,
        }
    }

    /// Names of the instances this constraint refers to.
    fn instances(&self) -> Vec<&ArcStr> {
        match self {
            Self::Place { inst, .. } => vec![inst],
            Self::PlaceRelative { port, target, .. } => vec![&port.instance, &target.instance],
            Self::Join(a, b) => vec![&a.instance, &b.instance],
        }
    }
}

/// Looks up an instance by name.
pub(crate) fn find_instance<'a>(
    instances: &'a IndexMap<ArcStr, Instance>,
    name: &ArcStr,
) -> Result<&'a Instance> {
    instances.get(name).ok_or_else(|| {
        ErrorSource::InstanceNotFound {
            instance: name.clone(),
            available: instances.keys().cloned().collect(),
        }
        .into()
    })
}

/// Resolves a port reference to a port in the parent's coordinates.
pub(crate) fn find_port(instances: &IndexMap<ArcStr, Instance>, id: &PortRef) -> Result<Port> {
    let inst = find_instance(instances, &id.instance)?;
    inst.port(&id.port).map_err(|_| {
        ErrorSource::PortNotFound {
            instance: id.instance.clone(),
            port: id.port.clone(),
            available: inst.cell().port_names(),
        }
        .into()
    })
}

/// Resolves `specs` into absolute instance transformations.
///
/// Instances that no constraint positions stay where they are.
/// A group of instances connected only through joins is anchored
/// by fixing the first instance of its first declared join.
pub fn place_instances(
    instances: &mut IndexMap<ArcStr, Instance>,
    specs: &[PlaceSpec],
    tolerance: f64,
) -> Result<()> {
    for spec in specs {
        for name in spec.instances() {
            find_instance(instances, name)?;
        }
    }

    let mut fixed: IndexSet<ArcStr> = IndexSet::new();
    let mut constrained: IndexSet<ArcStr> = IndexSet::new();
    let mut pending = Vec::new();

    for spec in specs {
        match spec {
            PlaceSpec::Place {
                inst,
                position,
                angle,
                flip_h,
                flip_v,
            } => {
                let mut orientation = Orientation::default();
                if *flip_v {
                    orientation.reflect_vert();
                }
                if *flip_h {
                    orientation.reflect_horiz();
                }
                orientation.rotate(*angle);

                let instance = instances
                    .get_mut(inst)
                    .ok_or_else(|| ErrorSource::Internal(format!("missing instance {inst}")))?;
                if fixed.contains(inst) {
                    if !instance.loc().approx_eq(*position, tolerance)
                        || instance.orientation() != orientation
                    {
                        return Err(ErrorSource::ConflictingPlacement(inst.clone()).into());
                    }
                    continue;
                }
                instance.set_loc(*position);
                instance.set_orientation(orientation);
                fixed.insert(inst.clone());
            }
            PlaceSpec::PlaceRelative { port, .. } => {
                constrained.insert(port.instance.clone());
                pending.push(spec);
            }
            PlaceSpec::Join(a, b) => {
                constrained.insert(a.instance.clone());
                constrained.insert(b.instance.clone());
                pending.push(spec);
            }
        }
    }

    for name in instances.keys() {
        if !constrained.contains(name) {
            fixed.insert(name.clone());
        }
    }

    while !pending.is_empty() {
        let mut remaining = Vec::new();
        let mut progress = false;
        for spec in pending {
            if apply_constraint(instances, &mut fixed, spec, tolerance)? {
                progress = true;
            } else {
                remaining.push(spec);
            }
        }
        pending = remaining;

        if !progress && !pending.is_empty() {
            let anchor = pending.iter().find_map(|spec| match spec {
                PlaceSpec::Join(a, _) if !fixed.contains(&a.instance) => Some(&a.instance),
                PlaceSpec::Join(_, b) if !fixed.contains(&b.instance) => Some(&b.instance),
                _ => None,
            });
            match anchor {
                Some(name) => {
                    debug!("anchoring join group at instance {name}");
                    fixed.insert(name.clone());
                }
                None => {
                    let mut names: Vec<ArcStr> = Vec::new();
                    for spec in pending.iter() {
                        if let PlaceSpec::PlaceRelative { port, .. } = spec {
                            if !names.contains(&port.instance) {
                                names.push(port.instance.clone());
                            }
                        }
                    }
                    return Err(ErrorSource::CircularPlacement(names).into());
                }
            }
        }
    }

    Ok(())
}

/// Applies or verifies a relative constraint.
///
/// Returns `false` if neither side of the constraint is fixed yet.
fn apply_constraint(
    instances: &mut IndexMap<ArcStr, Instance>,
    fixed: &mut IndexSet<ArcStr>,
    spec: &PlaceSpec,
    tolerance: f64,
) -> Result<bool> {
    match spec {
        PlaceSpec::PlaceRelative {
            port,
            target,
            offset,
            angle,
        } => {
            if !fixed.contains(&target.instance) {
                return Ok(false);
            }
            let goal = find_port(instances, target)?.position() + *offset;
            if fixed.contains(&port.instance) {
                let placed = find_port(instances, port)?;
                let rotated_ok = angle
                    .map(|a| {
                        let o = instances[&port.instance].orientation();
                        angles_match(o.angle, a, ANGLE_TOLERANCE)
                    })
                    .unwrap_or(true);
                if !placed.position().approx_eq(goal, tolerance) || !rotated_ok {
                    return Err(ErrorSource::ConflictingPlacement(port.instance.clone()).into());
                }
                return Ok(true);
            }

            let inst = find_instance(instances, &port.instance)?;
            let local = inst
                .cell()
                .port(&port.port)
                .map_err(|_| port_not_found(inst, port))?
                .clone();
            let mut orientation = inst.orientation();
            if let Some(angle) = angle {
                orientation = Orientation::new(orientation.reflect_vert, *angle);
            }
            move_port_to(instances, &port.instance, &local, goal, orientation)?;
            fixed.insert(port.instance.clone());
            Ok(true)
        }
        PlaceSpec::Join(a, b) => {
            let (anchor, free) = match (fixed.contains(&a.instance), fixed.contains(&b.instance)) {
                (true, true) => {
                    let pa = find_port(instances, a)?;
                    let pb = find_port(instances, b)?;
                    if !pa.position().approx_eq(pb.position(), tolerance)
                        || !angles_match(pa.angle(), pb.angle() + 180., ANGLE_TOLERANCE)
                    {
                        return Err(ErrorSource::ConflictingPlacement(b.instance.clone()).into());
                    }
                    return Ok(true);
                }
                (true, false) => (a, b),
                (false, true) => (b, a),
                (false, false) => return Ok(false),
            };

            let target = find_port(instances, anchor)?;
            let inst = find_instance(instances, &free.instance)?;
            let local = inst
                .cell()
                .port(&free.port)
                .map_err(|_| port_not_found(inst, free))?
                .clone();
            let reflect = inst.orientation().reflect_vert;
            let local_angle = if reflect {
                -local.angle()
            } else {
                local.angle()
            };
            let orientation = Orientation::new(reflect, target.angle() + 180. - local_angle);
            move_port_to(
                instances,
                &free.instance,
                &local,
                target.position(),
                orientation,
            )?;
            fixed.insert(free.instance.clone());
            Ok(true)
        }
        PlaceSpec::Place { .. } => Ok(true),
    }
}

fn port_not_found(inst: &Instance, id: &PortRef) -> crate::error::LumenError {
    ErrorSource::PortNotFound {
        instance: id.instance.clone(),
        port: id.port.clone(),
        available: inst.cell().port_names(),
    }
    .into()
}

/// Orients an instance and moves it so that its local port `local` lands on `goal`.
fn move_port_to(
    instances: &mut IndexMap<ArcStr, Instance>,
    name: &ArcStr,
    local: &Port,
    goal: Point,
    orientation: Orientation,
) -> Result<()> {
    let rotated = local
        .position()
        .transform(Transformation::with_loc_and_orientation(
            Point::zero(),
            orientation,
        ));
    let inst = instances
        .get_mut(name)
        .ok_or_else(|| ErrorSource::Internal(format!("missing instance {name}")))?;
    inst.set_orientation(orientation);
    inst.set_loc(goal - rotated);
    debug!(
        "placed instance {name} at {} rotated by {}",
        inst.loc(),
        orientation.angle
    );
    Ok(())
}
