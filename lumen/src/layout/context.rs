//! Context methods for instantiating component layouts.

use std::sync::Arc;

use lumengeom::bbox::Bbox;

use super::cell::{Cell, CellKey, Element, Instance};
use super::port::{Port, PortConflictStrategy, PortError};
use crate::component::Component;
use crate::config::TechConfig;
use crate::data::LumenCtx;
use crate::deps::arcstr::ArcStr;
use crate::error::Result as LumenResult;
use crate::generation::{GeneratedCheck, GenerationMap, ParamKey};

/// Context for creating the layout view of a [`Component`].
pub struct LayoutCtx {
    /// The global [`LumenCtx`].
    pub(crate) inner: LumenCtx,
    /// The layout view of the cell being created.
    pub(crate) cell: Cell,
}

/// Cell data for a layout.
#[derive(Debug)]
pub(crate) struct LayoutData {
    /// A map of generated cells.
    cells: GenerationMap<ParamKey, CellKey, Cell>,
}

impl LayoutData {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            cells: GenerationMap::new(),
        }
    }

    /// Returns the generated cell if it already exists or generates a new ID.
    pub(crate) fn get_generated_cell<T>(
        &mut self,
        params: &T::Params,
    ) -> LumenResult<GeneratedCheck<Arc<Cell>, CellKey>>
    where
        T: Component,
    {
        Ok(self.cells.get(ParamKey::from_params::<T>(params)?))
    }

    /// Adds a cell to the map based on its [`CellKey`].
    pub(crate) fn set_cell(&mut self, cell: Cell) -> Arc<Cell> {
        self.cells.set(cell.id(), cell.name().clone(), cell)
    }

    /// Generates a new [`CellKey`] to allow for a new cell to be created.
    pub(crate) fn gen_id(&mut self) -> CellKey {
        self.cells.gen_id()
    }

    /// Allocates an unused name derived from the given base name.
    pub(crate) fn alloc_name(&self, base_name: impl Into<ArcStr>) -> ArcStr {
        self.cells.alloc_name(base_name)
    }

    /// Returns an iterator over the cells in the map.
    pub(crate) fn cells(&self) -> impl Iterator<Item = &Arc<Cell>> {
        self.cells.values()
    }
}

impl LayoutCtx {
    /// Returns a reference to the global [`LumenCtx`].
    #[inline]
    pub fn inner(&self) -> &LumenCtx {
        &self.inner
    }

    /// Returns the technology configuration.
    #[inline]
    pub fn config(&self) -> Arc<TechConfig> {
        self.inner.config()
    }

    /// Returns the name of the cell being generated.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        self.cell.name()
    }

    /// Returns an iterator over the [`Element`]s in the current cell.
    pub fn elems(&self) -> impl Iterator<Item = &Element> {
        self.cell.elems()
    }

    /// Returns an iterator over the [`Instance`]s in the current cell.
    pub fn insts(&self) -> impl Iterator<Item = &Instance> {
        self.cell.insts()
    }

    /// Instantiates a layout instance of component `T` with params `params`.
    #[inline]
    pub fn instantiate<T>(&mut self, params: &T::Params) -> LumenResult<Instance>
    where
        T: Component,
    {
        self.inner.instantiate_layout::<T>(params)
    }

    /// Adds an instance to the current cell.
    pub fn add_instance(&mut self, inst: Instance) {
        self.cell.add_inst(inst);
    }

    /// Adds a primitive element to the current cell.
    pub fn draw(&mut self, elem: Element) {
        self.cell.add(elem);
    }

    /// Adds all elements from the given iterator to this cell.
    pub fn draw_all(&mut self, elems: impl IntoIterator<Item = Element>) {
        self.cell.add_elements(elems);
    }

    pub fn bbox(&self) -> Bbox {
        self.cell.bbox()
    }

    /// Adds a [`Port`] to the cell.
    pub fn add_port(&mut self, port: Port) -> Result<(), PortError> {
        self.cell.add_port(port)
    }

    /// Adds a [`Port`] to the cell, resolving conflicts with the provided strategy.
    pub fn add_port_with_strategy(
        &mut self,
        port: Port,
        port_conflict_strategy: PortConflictStrategy,
    ) -> Result<(), PortError> {
        self.cell
            .add_port_with_strategy(port, port_conflict_strategy)
    }

    /// Adds several [`Port`]s to the cell.
    pub fn add_ports(&mut self, ports: impl IntoIterator<Item = Port>) -> Result<(), PortError> {
        self.cell.add_ports(ports)
    }

    /// Retrieves a port of the cell being generated.
    pub fn port(&self, name: &str) -> Result<&Port, PortError> {
        self.cell.port(name)
    }

    pub fn set_metadata<T: Send + Sync + 'static>(&mut self, data: T) -> bool {
        self.cell.set_metadata(data)
    }

    pub fn get_metadata<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.cell.get_metadata::<T>()
    }
}
