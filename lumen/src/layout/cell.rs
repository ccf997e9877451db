//! Types related to the creation and instantiation of [`Cell`]s.

use std::sync::Arc;

use derive_builder::Builder;
use lumengeom::bbox::{Bbox, BoundBox, SizeInfo};
use lumengeom::orientation::Orientation;
use lumengeom::transform::{Transform, Transformation, Translate};
use lumengeom::{Point, Shape};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use state::Container;

use super::layers::Layer;
use super::port::{Port, PortConflictStrategy, PortError, PortMap};
use super::validation::validate_cell;
use crate::deps::arcstr::ArcStr;
use crate::error::ErrorSource;

/// The layout view of a cell.
#[derive(Debug, Default)]
pub struct Cell {
    /// The cell's identifier.
    id: CellKey,
    /// The cell's name.
    name: ArcStr,
    /// A list of instances contained in the cell.
    insts: Vec<Instance>,
    /// A list of primitive/geometric elements.
    elems: Vec<Element>,
    /// The cell's ports, keyed by name.
    ports: PortMap,

    /// Cache of values that are frequently used
    /// after a cell is done being generated.
    ///
    /// Cached values are computed after the cell is [frozen](Cell::freeze).
    cache: Option<Cache>,

    /// User-defined metadata.
    metadata: Container![Send + Sync],
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Cache {
    bbox: Bbox,
}

new_key_type! {
    /// A unique identifier for cells.
    pub struct CellKey;
}

/// An instance of a cell in a layout.
#[derive(Debug, Clone, Builder)]
pub struct Instance {
    /// The instance name.
    #[builder(default, setter(into))]
    pub(crate) name: ArcStr,
    /// A pointer to the reference cell.
    pub(crate) cell: Arc<Cell>,
    /// The location of the cell.
    #[builder(default)]
    pub(crate) loc: Point,
    /// The orientation of the cell.
    #[builder(default)]
    pub(crate) orientation: Orientation,
}

/// A primitive geometric element.
///
/// Combines a geometric [`Shape`] with a [`Layer`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Element {
    /// The layer on which the element is drawn.
    pub layer: Layer,
    /// The element's shape.
    pub inner: Shape,
}

impl Element {
    /// Creates a new [`Element`].
    pub fn new(layer: Layer, shape: impl Into<Shape>) -> Self {
        Self {
            layer,
            inner: shape.into(),
        }
    }

    pub fn into_inner(self) -> Shape {
        self.inner
    }
}

impl BoundBox for Element {
    #[inline]
    fn bbox(&self) -> Bbox {
        self.inner.bbox()
    }
}

impl Transform for Element {
    fn transform(&self, trans: Transformation) -> Self {
        Self {
            layer: self.layer.clone(),
            inner: self.inner.transform(trans),
        }
    }
}

impl Translate for Element {
    fn translate(&mut self, p: Point) {
        self.inner.translate(p);
    }
}

impl Cell {
    /// Create a new and empty Cell with ID `id`.
    pub fn new(id: CellKey) -> Self {
        Self {
            id,
            name: arcstr::literal!("unnamed"),
            ..Default::default()
        }
    }

    /// Returns the ID of the cell.
    #[inline]
    pub fn id(&self) -> CellKey {
        self.id
    }

    /// Returns the name of the cell.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Sets the name of the cell.
    #[inline]
    pub fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.name = name.into();
    }

    /// Returns an iterator over the instances in the cell.
    #[inline]
    pub fn insts(&self) -> impl Iterator<Item = &Instance> {
        self.insts.iter()
    }

    /// Looks up an instance by name.
    pub fn inst(&self, name: &str) -> Option<&Instance> {
        self.insts.iter().find(|inst| inst.name() == name)
    }

    /// Adds an instance to the cell.
    pub fn add_inst(&mut self, inst: impl Into<Instance>) {
        debug_assert!(!self.is_frozen());
        self.insts.push(inst.into());
    }

    /// Returns an iterator over the elements in the cell.
    #[inline]
    pub fn elems(&self) -> impl Iterator<Item = &Element> {
        self.elems.iter()
    }

    /// Adds an element to the cell.
    pub fn add<T>(&mut self, elem: T)
    where
        T: Into<Element>,
    {
        debug_assert!(!self.is_frozen());
        self.elems.push(elem.into());
    }

    /// Adds all elements from the given iterator to this cell.
    pub fn add_elements(&mut self, elems: impl IntoIterator<Item = Element>) {
        debug_assert!(!self.is_frozen());
        self.elems.extend(elems);
    }

    /// Retrieves a reference to the [`Port`] named `name`.
    pub fn port(&self, name: &str) -> std::result::Result<&Port, PortError> {
        self.ports.port(name)
    }

    /// Returns an iterator over the ports in the cell, in insertion order.
    #[inline]
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.ports()
    }

    /// Returns the names of the ports in the cell.
    pub fn port_names(&self) -> Vec<ArcStr> {
        self.ports.names().cloned().collect()
    }

    /// Adds a [`Port`] to the cell.
    pub fn add_port(&mut self, port: Port) -> Result<(), PortError> {
        debug_assert!(!self.is_frozen());
        self.ports.add_port(port)
    }

    /// Adds a [`Port`] to the cell, resolving conflicts using the provided strategy.
    pub fn add_port_with_strategy(
        &mut self,
        port: Port,
        port_conflict_strategy: PortConflictStrategy,
    ) -> Result<(), PortError> {
        debug_assert!(!self.is_frozen());
        self.ports
            .add_port_with_strategy(port, port_conflict_strategy)
    }

    /// Adds several [`Port`]s to the cell.
    pub fn add_ports(&mut self, ports: impl IntoIterator<Item = Port>) -> Result<(), PortError> {
        debug_assert!(!self.is_frozen());
        self.ports.add_ports(ports)
    }

    /// Creates a rectangular [`Bbox`] surrounding all elements in the layout.
    pub fn bbox(&self) -> Bbox {
        // The cache cannot be updated here, since we only hold a shared reference.
        if let Some(ref cache) = self.cache {
            return cache.bbox;
        }
        let mut bbox = Bbox::empty();
        for elem in &self.elems {
            bbox = elem.inner.union(bbox);
        }
        for inst in &self.insts {
            bbox = inst.bbox().union(bbox);
        }
        bbox
    }

    /// The extents of the cell relative to its origin.
    pub fn size_info(&self) -> SizeInfo {
        self.bbox().size_info()
    }

    /// Freezes the cell, caching useful values and preventing further modification.
    #[inline]
    pub(crate) fn freeze(&mut self) {
        self.metadata.freeze();
        self.compute_cache();
    }

    /// Returns true if the cell is frozen.
    ///
    /// See [`Cell::freeze`] for more information.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.cache.is_some()
    }

    /// (Re)computes cached values and updates the cache.
    fn compute_cache(&mut self) {
        let cache = Cache { bbox: self.bbox() };
        self.cache = Some(cache);
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        let validation = validate_cell(self);
        validation.log();
        if let Some(err) = validation.first_error() {
            return Err(ErrorSource::InvalidLayout(err).into());
        }
        Ok(())
    }

    /// Attaches a piece of typed metadata to the cell.
    ///
    /// Returns `false` if metadata of the same type was already set.
    pub fn set_metadata<T: Send + Sync + 'static>(&mut self, data: T) -> bool {
        self.metadata.set(data)
    }

    /// Retrieves metadata of type `T`, if any was set.
    pub fn get_metadata<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.metadata.try_get::<T>()
    }
}

impl Translate for Cell {
    fn translate(&mut self, p: Point) {
        debug_assert!(!self.is_frozen());

        for inst in self.insts.iter_mut() {
            inst.translate(p);
        }
        for elem in self.elems.iter_mut() {
            elem.translate(p);
        }
        for port in self.ports.ports_mut() {
            port.translate(p);
        }
    }
}

impl BoundBox for Cell {
    fn bbox(&self) -> Bbox {
        Cell::bbox(self)
    }
}

impl Instance {
    /// Creates a new [`Instance`].
    pub fn new(cell: impl Into<Arc<Cell>>) -> Self {
        let cell = cell.into();
        Self {
            name: cell.name.clone(),
            cell,
            loc: Point::zero(),
            orientation: Orientation::default(),
        }
    }

    /// Creates a new [`InstanceBuilder`].
    #[inline]
    pub fn builder() -> InstanceBuilder {
        InstanceBuilder::default()
    }

    /// Returns the name of the instance.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Sets the name of the instance.
    #[inline]
    pub fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.name = name.into();
    }

    pub fn with_name(mut self, name: impl Into<ArcStr>) -> Self {
        self.set_name(name);
        self
    }

    /// Returns a pointer to the instance's reference cell.
    #[inline]
    pub fn cell(&self) -> &Arc<Cell> {
        &self.cell
    }

    /// Returns the transformation associated with the instance.
    #[inline]
    pub fn transformation(&self) -> Transformation {
        Transformation::with_loc_and_orientation(self.loc, self.orientation)
    }

    /// Returns the location of the instance.
    #[inline]
    pub fn loc(&self) -> Point {
        self.loc
    }

    /// Sets the location of the instance.
    #[inline]
    pub fn set_loc(&mut self, p: impl Into<Point>) {
        self.loc = p.into();
    }

    /// Returns the orientation of the instance.
    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Sets the orientation of the instance.
    #[inline]
    pub fn set_orientation(&mut self, o: impl Into<Orientation>) {
        self.orientation = o.into();
    }

    /// Returns the port named `name`, in the coordinates of the parent cell.
    pub fn port(&self, name: &str) -> std::result::Result<Port, PortError> {
        Ok(self.cell.port(name)?.transform(self.transformation()))
    }

    /// Returns all ports of the instance, in the coordinates of the parent cell.
    pub fn ports(&self) -> impl Iterator<Item = Port> + '_ {
        let tf = self.transformation();
        self.cell.ports().map(move |port| port.transform(tf))
    }
}

impl BoundBox for Instance {
    fn bbox(&self) -> Bbox {
        let bbox = self.cell.bbox();
        if bbox.is_empty() {
            return bbox;
        }
        let tf = self.transformation();
        let mut out = Bbox::empty();
        for corner in bbox.corners() {
            out = corner.transform(tf).union(out);
        }
        out
    }
}

impl Translate for Instance {
    fn translate(&mut self, p: Point) {
        self.loc.translate(p);
    }
}

#[cfg(test)]
mod tests {
    use lumengeom::Rect;

    use super::*;
    use crate::layout::trace::TraceTemplate;

    fn square_cell() -> Arc<Cell> {
        let mut cell = Cell::new(CellKey::default());
        cell.set_name("square");
        cell.add(Element::new(
            Layer::WgCore,
            Rect::new(Point::zero(), Point::new(10., 4.)),
        ));
        cell.add_port(Port::optical(
            "out",
            (10., 2.),
            0.,
            TraceTemplate::default(),
        ))
        .unwrap();
        cell.freeze();
        Arc::new(cell)
    }

    #[test]
    fn rotated_instance_transforms_bbox_and_ports() {
        let mut inst = Instance::new(square_cell());
        inst.set_loc((5., 0.));
        inst.set_orientation(Orientation::rotation(90.));

        let bbox = inst.bbox();
        assert!(bbox.p0.approx_eq(Point::new(1., 0.), 1e-9));
        assert!(bbox.p1.approx_eq(Point::new(5., 10.), 1e-9));

        let port = inst.port("out").unwrap();
        assert!(port.position().approx_eq(Point::new(3., 10.), 1e-9));
        assert!((port.angle() - 90.).abs() < 1e-9);
    }

    #[test]
    fn metadata_is_typed() {
        #[derive(Debug, PartialEq)]
        struct Tag(u32);

        let mut cell = Cell::new(CellKey::default());
        assert!(cell.get_metadata::<Tag>().is_none());
        assert!(cell.set_metadata(Tag(3)));
        cell.freeze();
        assert_eq!(cell.get_metadata::<Tag>(), Some(&Tag(3)));
    }
}
