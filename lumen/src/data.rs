use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::component::{Component, View};
use crate::config::TechConfig;
use crate::deps::arcstr::ArcStr;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::generation::GeneratedCheck;
use crate::layout::cell::{Cell, CellKey, Instance as LayoutInstance};
use crate::layout::context::{LayoutCtx, LayoutData};

pub(crate) struct LumenData {
    layouts: LayoutData,
    config: Arc<TechConfig>,
}

impl LumenData {
    #[inline]
    pub(crate) fn new(config: TechConfig) -> Self {
        Self {
            layouts: LayoutData::new(),
            config: Arc::new(config),
        }
    }
}

/// The shared context through which all cells are generated.
///
/// Cloning is cheap; clones refer to the same cell cache.
#[derive(Clone)]
pub struct LumenCtx {
    inner: Arc<RwLock<LumenData>>,
}

impl Default for LumenCtx {
    fn default() -> Self {
        Self::new(TechConfig::default())
    }
}

impl LumenCtx {
    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<LumenData> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<LumenData> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn new(config: TechConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(LumenData::new(config))),
        }
    }

    /// Returns the technology configuration of this context.
    pub fn config(&self) -> Arc<TechConfig> {
        self.read().config.clone()
    }

    /// Returns all cells generated so far.
    pub fn cells(&self) -> Vec<Arc<Cell>> {
        self.read().layouts.cells().cloned().collect()
    }

    pub fn instantiate_layout<T>(&self, params: &T::Params) -> Result<LayoutInstance>
    where
        T: Component,
    {
        let check = {
            let mut inner = self.write();
            inner.layouts.get_generated_cell::<T>(params)?
        };

        Ok(match check {
            GeneratedCheck::Exists(cell) => LayoutInstance::new(cell),
            GeneratedCheck::MustGenerate(id) => {
                let cell = self.generate_layout::<T>(params, id)?;
                LayoutInstance::new(cell)
            }
        })
    }

    fn init_component<T>(&self, params: &T::Params) -> Result<T>
    where
        T: Component,
    {
        let component = with_err_context(T::new(params, self), || ErrorContext::InitComponent {
            type_name: std::any::type_name::<T>().into(),
        })?;
        Ok(component)
    }

    pub(crate) fn generate_layout<T>(&self, params: &T::Params, id: CellKey) -> Result<Arc<Cell>>
    where
        T: Component,
    {
        let mut ctx = LayoutCtx {
            inner: self.clone(),
            cell: Cell::new(id),
        };
        let component = self.init_component::<T>(params)?;
        let name = component.name();
        ctx.cell.set_name(name.clone());
        with_err_context(component.layout(&mut ctx), || ErrorContext::GenComponent {
            name,
            type_name: std::any::type_name::<T>().into(),
            view: View::Layout,
        })?;
        self.finish_cell(ctx)
    }

    /// Generates a one-off cell that is not memoized by parameters.
    ///
    /// Used for geometry such as connectors, whose cells depend on
    /// the positions of the ports they join.
    pub fn generate_cell<F>(&self, name: impl Into<ArcStr>, f: F) -> Result<Arc<Cell>>
    where
        F: FnOnce(&mut LayoutCtx) -> Result<()>,
    {
        let name = name.into();
        let id = self.write().layouts.gen_id();
        let mut ctx = LayoutCtx {
            inner: self.clone(),
            cell: Cell::new(id),
        };
        ctx.cell.set_name(name.clone());
        with_err_context(f(&mut ctx), || {
            ErrorContext::Task(arcstr::format!("generating cell {}", name))
        })?;
        self.finish_cell(ctx)
    }

    fn finish_cell(&self, mut ctx: LayoutCtx) -> Result<Arc<Cell>> {
        ctx.cell.freeze();
        ctx.cell.validate()?;

        // Only the name may change once the cell is frozen.
        let cell = {
            let mut inner = self.write();
            let name = inner.layouts.alloc_name(ctx.cell.name().clone());
            ctx.cell.set_name(name);
            inner.layouts.set_cell(ctx.cell)
        };

        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::NoParams;
    use crate::layout::port::Port;

    struct Pad;

    impl Component for Pad {
        type Params = NoParams;

        fn new(_params: &Self::Params, _ctx: &LumenCtx) -> Result<Self> {
            Ok(Self)
        }

        fn name(&self) -> ArcStr {
            arcstr::literal!("pad")
        }

        fn layout(&self, ctx: &mut LayoutCtx) -> Result<()> {
            ctx.add_port(Port::electrical("m1", (0., 0.), 90.))?;
            Ok(())
        }
    }

    #[test]
    fn layouts_are_memoized() {
        let ctx = LumenCtx::default();
        let a = ctx.instantiate_layout::<Pad>(&NoParams).unwrap();
        let b = ctx.instantiate_layout::<Pad>(&NoParams).unwrap();
        assert!(Arc::ptr_eq(a.cell(), b.cell()));
        assert_eq!(ctx.cells().len(), 1);
    }

    #[test]
    fn one_off_cells_get_unique_names() {
        let ctx = LumenCtx::default();
        let a = ctx.generate_cell("wg", |_| Ok(())).unwrap();
        let b = ctx.generate_cell("wg", |_| Ok(())).unwrap();
        assert_eq!(a.name(), "wg");
        assert_eq!(b.name(), "wg_1");
    }
}
