use super::CodegenError;
use std::{
    fmt::{self, Display},
    rc::Rc,
};

use tracing::trace;

/// Conjunto fijo y ordenado de registros de propósito general.
///
/// La asignación es lineal: se entrega siempre el primer registro
/// libre en el orden de configuración, y cada registro debe liberarse
/// explícitamente exactamente una vez.
#[derive(Debug)]
pub struct RegisterPool {
    slots: Vec<Slot>,
}

#[derive(Debug)]
struct Slot {
    name: Rc<str>,
    free: bool,
}

/// Registro entregado por un [`RegisterPool`].
///
/// La identidad de un registro es su posición dentro del pool que lo
/// creó. Dos handles con la misma posición se refieren al mismo recurso
/// físico.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Register {
    index: usize,
    name: Rc<str>,
}

impl Register {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for Register {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.name)
    }
}

impl RegisterPool {
    /// Construye un pool con todos los registros libres.
    ///
    /// Nombres repetidos colapsan a su primera aparición, preservando
    /// el orden original.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut slots: Vec<Slot> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if slots.iter().all(|slot| &*slot.name != name) {
                slots.push(Slot {
                    name: Rc::from(name),
                    free: true,
                });
            }
        }

        RegisterPool { slots }
    }

    /// Toma el primer registro libre.
    pub fn allocate(&mut self) -> Result<Register, CodegenError> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.free)
            .ok_or(CodegenError::RegisterExhaustion)?;

        slot.free = false;
        trace!(register = %slot.name, "allocate");

        Ok(Register {
            index,
            name: Rc::clone(&slot.name),
        })
    }

    /// Devuelve un registro al pool.
    pub fn free(&mut self, reg: &Register) -> Result<(), CodegenError> {
        let slot = self
            .slot_mut(reg)
            .ok_or_else(|| CodegenError::ForeignRegister(reg.name().to_owned()))?;

        if slot.free {
            return Err(CodegenError::DoubleFree(reg.name().to_owned()));
        }

        slot.free = true;
        trace!(register = %reg, "free");

        Ok(())
    }

    /// Libera todos los registros sin condición.
    pub fn free_all(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.free = true;
        }
    }

    /// Un registro ajeno a este pool nunca se considera libre.
    pub fn is_free(&self, reg: &Register) -> bool {
        self.slot(reg).map_or(false, |slot| slot.free)
    }

    /// Cantidad de registros distintos.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Cantidad de registros actualmente asignados.
    pub fn allocated(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.free).count()
    }

    /// Itera en orden de configuración sobre `(nombre, libre)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.slots.iter().map(|slot| (&*slot.name, slot.free))
    }

    fn slot(&self, reg: &Register) -> Option<&Slot> {
        self.slots
            .get(reg.index)
            .filter(|slot| slot.name == reg.name)
    }

    fn slot_mut(&mut self, reg: &Register) -> Option<&mut Slot> {
        self.slots
            .get_mut(reg.index)
            .filter(|slot| slot.name == reg.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(pool: &RegisterPool) -> Vec<(&str, bool)> {
        pool.iter().collect()
    }

    #[test]
    fn starts_free_in_order() {
        let pool = RegisterPool::new(["x0", "x1"]);
        assert_eq!(names(&pool), vec![("x0", true), ("x1", true)]);
    }

    #[test]
    fn empty_pool() {
        let mut pool = RegisterPool::new(Vec::<String>::new());

        assert!(pool.is_empty());
        assert_eq!(pool.allocate(), Err(CodegenError::RegisterExhaustion));
    }

    #[test]
    fn duplicates_collapse_to_first() {
        let pool = RegisterPool::new(["x3", "x3", "x1"]);
        assert_eq!(names(&pool), vec![("x3", true), ("x1", true)]);
    }

    #[test]
    fn allocation_order_and_exhaustion() {
        let mut pool = RegisterPool::new(["x0", "x1", "x0"]);
        assert_eq!(pool.len(), 2);

        let first = pool.allocate().unwrap();
        let second = pool.allocate().unwrap();

        assert_eq!(first.name(), "x0");
        assert_eq!(second.name(), "x1");
        assert!(!pool.is_free(&first));
        assert!(!pool.is_free(&second));
        assert_eq!(pool.allocate(), Err(CodegenError::RegisterExhaustion));
    }

    #[test]
    fn freed_register_is_reused_first() {
        let mut pool = RegisterPool::new(["x0", "x1", "x2"]);
        let x0 = pool.allocate().unwrap();
        let _x1 = pool.allocate().unwrap();

        pool.free(&x0).unwrap();
        assert_eq!(pool.allocate().unwrap(), x0);
    }

    #[test]
    fn free_marks_register_free() {
        let mut pool = RegisterPool::new(["x0"]);
        let reg = pool.allocate().unwrap();

        pool.free(&reg).unwrap();
        assert!(pool.is_free(&reg));
        assert_eq!(pool.allocated(), 0);
    }

    #[test]
    fn double_free() {
        let mut pool = RegisterPool::new(["x0"]);
        let reg = pool.allocate().unwrap();

        pool.free(&reg).unwrap();
        let error = pool.free(&reg).unwrap_err();

        assert_eq!(error, CodegenError::DoubleFree("x0".to_owned()));
        assert_eq!(error.to_string(), "Register x0 is already free");
    }

    #[test]
    fn free_all_resets() {
        let mut pool = RegisterPool::new(["x0", "x1"]);
        pool.allocate().unwrap();
        pool.allocate().unwrap();

        pool.free_all();
        assert_eq!(pool.allocated(), 0);
        assert_eq!(pool.allocate().unwrap().name(), "x0");
    }

    #[test]
    fn foreign_register() {
        let mut ours = RegisterPool::new(["x0"]);
        let mut theirs = RegisterPool::new(["x0", "x1"]);

        theirs.allocate().unwrap();
        let foreign = theirs.allocate().unwrap();

        assert!(!ours.is_free(&foreign));
        assert_eq!(
            ours.free(&foreign),
            Err(CodegenError::ForeignRegister("x1".to_owned()))
        );
        assert_eq!(
            ours.free(&foreign).unwrap_err().to_string(),
            "Register x1 does not belong to this pool"
        );
    }
}
