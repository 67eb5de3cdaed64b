//! NDR pointer types and the referent registry
//!
//! NDR supports three pointer semantics:
//!
//! - Reference (`[ref]`): Non-null, data follows inline, no wire representation
//! - Unique (`[unique]`): Nullable, referent ID, no aliasing
//! - Full (`[ptr]`): Nullable, referent ID, aliasing allowed
//!
//! A referent ID is 4 bytes in NDR20 and 8 bytes in NDR64; 0 means null.
//! The pointee itself is a deferred body: it is written after the enclosing
//! block, once per distinct target, when the stub flushes the stream.
//!
//! On the encode side the registry keys targets by [`PtrKey`] (address plus
//! type). On the decode side it keys them by referent ID, and every pointer
//! carrying the same ID receives a clone of the same [`Referent`] handle.

use std::any::{Any, TypeId};
use std::cell::OnceCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::reader::ReferentFrame;
use crate::{NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result};

/// First referent ID handed out in a stream
pub const REFERENT_ID_BASE: u64 = 0x0002_0000;

/// Distance between consecutive referent IDs
pub const REFERENT_ID_STEP: u64 = 4;

/// Identity of a pointer target within one encode pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PtrKey {
    addr: usize,
    type_id: TypeId,
}

impl PtrKey {
    /// Key a value by its address. The type is part of the key, so a
    /// structure and its first field never alias each other.
    pub fn of<T: ?Sized + 'static>(value: &T) -> Self {
        Self {
            addr: value as *const T as *const () as usize,
            type_id: TypeId::of::<T>(),
        }
    }
}

/// Shared slot for a pointer target.
///
/// Built from a value for encoding, or handed out by [`NdrReader::read_pointer`]
/// in a pending state and filled when the deferred body is decoded. Clones
/// share the slot, so aliases observe the same `Rc<T>`.
pub struct Referent<T> {
    /// Referent ID this handle was decoded from; 0 when null or built locally
    id: u64,
    cell: Rc<OnceCell<Rc<T>>>,
}

impl<T> Referent<T> {
    pub fn null() -> Self {
        Self {
            id: 0,
            cell: Rc::new(OnceCell::new()),
        }
    }

    pub fn new(value: T) -> Self {
        Self::from_rc(Rc::new(value))
    }

    pub fn from_rc(value: Rc<T>) -> Self {
        Self {
            id: 0,
            cell: Rc::new(OnceCell::from(value)),
        }
    }

    pub(crate) fn pending(id: u64) -> Self {
        Self {
            id,
            cell: Rc::new(OnceCell::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_null(&self) -> bool {
        self.id == 0 && self.cell.get().is_none()
    }

    /// True once the target is available
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get().map(|rc| rc.as_ref())
    }

    /// Mutable access to the target while this handle is its only owner
    pub fn get_mut(&mut self) -> Option<&mut T> {
        Rc::get_mut(&mut self.cell)?.get_mut().and_then(Rc::get_mut)
    }

    pub fn shared(&self) -> Option<Rc<T>> {
        self.cell.get().cloned()
    }

    /// Like [`shared`](Self::shared), but a non-null referent whose body was
    /// never decoded is an error instead of `None`.
    pub fn resolve(&self) -> Result<Option<Rc<T>>> {
        match self.cell.get() {
            Some(rc) => Ok(Some(Rc::clone(rc))),
            None if self.id == 0 => Ok(None),
            None => Err(NdrError::UnresolvedReferent(self.id)),
        }
    }

    /// Take the target out, cloning only if it is still shared.
    pub fn into_value(self) -> Result<Option<T>>
    where
        T: Clone,
    {
        let shared = self.resolve()?;
        drop(self);
        Ok(shared.map(|rc| Rc::try_unwrap(rc).unwrap_or_else(|rc| (*rc).clone())))
    }

    /// True when both handles refer to the same slot or the same target
    pub fn ptr_eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.cell, &other.cell) {
            return true;
        }
        match (self.cell.get(), other.cell.get()) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn fill(&self, value: T) {
        // a slot is filled by exactly one deferred body
        let _ = self.cell.set(Rc::new(value));
    }
}

impl<T> Clone for Referent<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T> Default for Referent<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: PartialEq> PartialEq for Referent<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => a == b,
            // pending handles only equal other handles to the same ID
            (None, None) => self.id == other.id,
            _ => false,
        }
    }
}

impl<T: Eq> Eq for Referent<T> {}

impl<T: fmt::Debug> fmt::Debug for Referent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.get(), self.id) {
            (Some(value), _) => f.debug_tuple("Referent").field(value).finish(),
            (None, 0) => f.write_str("Referent(null)"),
            (None, id) => write!(f, "Referent(pending {:#x})", id),
        }
    }
}

impl<'a> NdrWriter<'a> {
    /// Write a pointer to the target identified by `key`.
    ///
    /// `None` writes a null referent and drops `body` unrun. A key already
    /// seen in this stream reuses its referent ID and drops `body`, so the
    /// target is written once. A new key gets the next ID and `body` is
    /// queued until the next flush.
    pub fn write_pointer<F>(&mut self, key: Option<PtrKey>, body: F) -> Result<()>
    where
        F: FnOnce(&mut NdrWriter<'a>) -> Result<()> + 'a,
    {
        let Some(key) = key else {
            return self.write_null_pointer();
        };
        if let Some(&id) = self.referents.get(&key) {
            trace!(id, "aliased pointer");
            return self.write_referent_id(id);
        }
        let id = self.next_referent;
        self.next_referent += REFERENT_ID_STEP;
        self.referents.insert(key, id);
        self.write_referent_id(id)?;
        self.deferred.push(Box::new(body));
        Ok(())
    }

    pub fn write_null_pointer(&mut self) -> Result<()> {
        self.write_referent_id(0)
    }

    /// Write a pointer whose body is the referent's own NDR encoding.
    pub fn write_referent<T: NdrEncode + 'static>(&mut self, referent: &'a Referent<T>) -> Result<()> {
        match referent.cell.get() {
            Some(rc) => {
                let value: &'a T = rc;
                self.write_pointer(Some(PtrKey::of(value)), move |w| value.ndr_encode(w))
            }
            None if referent.id == 0 => self.write_null_pointer(),
            None => Err(NdrError::UnresolvedReferent(referent.id)),
        }
    }

    fn write_referent_id(&mut self, id: u64) -> Result<()> {
        if self.ctx.is_ndr64() {
            self.write_u64(id)
        } else {
            let id = u32::try_from(id).map_err(|_| NdrError::IntegerOverflow)?;
            self.write_u32(id)
        }
    }
}

impl NdrReader {
    /// Read a pointer and arrange for its target to be decoded by `body` at
    /// the next flush.
    ///
    /// A null referent returns a null handle and `body` is never run. A
    /// referent ID already seen in this stream returns the handle issued for
    /// it the first time, without queueing `body` again.
    ///
    /// Fails with `DepthLimitExceeded` when the new body would nest deeper
    /// than the context allows, and with `InvalidPointer` when an alias
    /// points back at a body that contains it.
    pub fn read_pointer<T, F>(&mut self, body: F) -> Result<Referent<T>>
    where
        T: 'static,
        F: FnOnce(&mut NdrReader) -> Result<T> + 'static,
    {
        let id = self.read_referent_id()?;
        if id == 0 {
            return Ok(Referent::null());
        }
        if let Some(existing) = self.referents.get(&id) {
            let cell = Rc::clone(existing)
                .downcast::<OnceCell<Rc<T>>>()
                .map_err(|_| NdrError::InvalidPointer(id))?;
            self.link_referent(id, true)?;
            trace!(id, "aliased referent");
            return Ok(Referent { id, cell });
        }

        let depth = self.current.map_or(1, |parent| parent.depth + 1);
        if depth > self.ctx.max_depth {
            debug!(id, depth, limit = self.ctx.max_depth, "rejecting nested referent");
            return Err(NdrError::DepthLimitExceeded {
                depth,
                limit: self.ctx.max_depth,
            });
        }
        self.link_referent(id, false)?;

        let referent = Referent::pending(id);
        let slot: Rc<dyn Any> = referent.cell.clone();
        self.referents.insert(id, slot);

        let target = referent.clone();
        let frame = ReferentFrame { id, depth };
        self.deferred.push(Box::new(move |r: &mut NdrReader| {
            r.current = Some(frame);
            let value = body(r)?;
            target.fill(value);
            Ok(())
        }));
        Ok(referent)
    }

    /// Read a pointer whose body is the target's own NDR decoding.
    pub fn read_referent<T: NdrDecode + 'static>(&mut self) -> Result<Referent<T>> {
        self.read_pointer(T::ndr_decode)
    }

    fn read_referent_id(&mut self) -> Result<u64> {
        if self.ctx.is_ndr64() {
            self.read_u64()
        } else {
            Ok(self.read_u32()?.into())
        }
    }
}

/// Trait for NDR pointer types
pub trait NdrPtr {
    type Target;

    /// Check if the pointer is null
    fn is_null(&self) -> bool;

    /// Get the inner value, if any
    fn get(&self) -> Option<&Self::Target>;

    /// Get mutable access to the inner value. `None` when null or shared.
    fn get_mut(&mut self) -> Option<&mut Self::Target>;
}

/// Reference pointer - non-null, data follows inline
///
/// The `[ref]` attribute in MIDL on a top-level parameter. The pointer
/// itself is not transmitted; the pointee data is always present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPtr<T>(pub T);

impl<T> RefPtr<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Default> Default for RefPtr<T> {
    fn default() -> Self {
        Self(T::default())
    }
}

impl<T> Deref for RefPtr<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for RefPtr<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> NdrPtr for RefPtr<T> {
    type Target = T;

    fn is_null(&self) -> bool {
        false
    }

    fn get(&self) -> Option<&T> {
        Some(&self.0)
    }

    fn get_mut(&mut self) -> Option<&mut T> {
        Some(&mut self.0)
    }
}

impl<T: NdrEncode> NdrEncode for RefPtr<T> {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        // Reference pointers have no wire representation - just encode the data
        self.0.ndr_encode(w)
    }

    fn ndr_align() -> usize {
        T::ndr_align()
    }
}

impl<T: NdrDecode> NdrDecode for RefPtr<T> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        Ok(Self(T::ndr_decode(r)?))
    }

    fn ndr_align() -> usize {
        T::ndr_align()
    }
}

/// Unique pointer - nullable, no aliasing
///
/// The `[unique]` attribute in MIDL. Encoded as a referent ID (0 = null)
/// with the pointee deferred. Cloning copies the target, so two unique
/// pointers never share one.
#[derive(Debug, PartialEq, Eq)]
pub struct UniquePtr<T>(Referent<T>);

impl<T> UniquePtr<T> {
    pub fn new(value: T) -> Self {
        Self(Referent::new(value))
    }

    pub fn null() -> Self {
        Self(Referent::null())
    }

    pub fn from_option(opt: Option<T>) -> Self {
        opt.map_or_else(Self::null, Self::new)
    }

    /// Take the target. A pointer whose body was never decoded is
    /// `UnresolvedReferent`, not `None`.
    pub fn into_option(self) -> Result<Option<T>>
    where
        T: Clone,
    {
        self.0.into_value()
    }

    pub fn as_ref(&self) -> Option<&T> {
        self.0.get()
    }

    pub fn as_mut(&mut self) -> Option<&mut T> {
        self.0.get_mut()
    }

    pub fn referent(&self) -> &Referent<T> {
        &self.0
    }
}

impl<T: Clone> Clone for UniquePtr<T> {
    fn clone(&self) -> Self {
        match self.0.get() {
            Some(value) => Self::new(value.clone()),
            None => Self(self.0.clone()),
        }
    }
}

impl<T> Default for UniquePtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<Option<T>> for UniquePtr<T> {
    fn from(opt: Option<T>) -> Self {
        Self::from_option(opt)
    }
}

impl<T> NdrPtr for UniquePtr<T> {
    type Target = T;

    fn is_null(&self) -> bool {
        self.0.is_null()
    }

    fn get(&self) -> Option<&T> {
        self.0.get()
    }

    fn get_mut(&mut self) -> Option<&mut T> {
        self.0.get_mut()
    }
}

impl<T: NdrEncode + 'static> NdrEncode for UniquePtr<T> {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_referent(&self.0)
    }

    fn ndr_align() -> usize {
        4 // For referent ID
    }
}

impl<T: NdrDecode + 'static> NdrDecode for UniquePtr<T> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        Ok(Self(r.read_referent()?))
    }

    fn ndr_align() -> usize {
        4
    }
}

/// Full pointer - nullable, aliasing allowed
///
/// The `[ptr]` attribute in MIDL. Clones share the target, and every full
/// pointer to one target is written with the same referent ID and a single
/// copy of the data. Decoding restores the sharing.
#[derive(Debug, PartialEq, Eq)]
pub struct FullPtr<T>(Referent<T>);

impl<T> FullPtr<T> {
    pub fn new(value: T) -> Self {
        Self(Referent::new(value))
    }

    pub fn from_rc(value: Rc<T>) -> Self {
        Self(Referent::from_rc(value))
    }

    pub fn null() -> Self {
        Self(Referent::null())
    }

    pub fn from_option(opt: Option<T>) -> Self {
        opt.map_or_else(Self::null, Self::new)
    }

    pub fn as_ref(&self) -> Option<&T> {
        self.0.get()
    }

    pub fn shared(&self) -> Option<Rc<T>> {
        self.0.shared()
    }

    /// True when both pointers refer to the same target
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }

    pub fn referent(&self) -> &Referent<T> {
        &self.0
    }
}

impl<T> Clone for FullPtr<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for FullPtr<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<Option<T>> for FullPtr<T> {
    fn from(opt: Option<T>) -> Self {
        Self::from_option(opt)
    }
}

impl<T> NdrPtr for FullPtr<T> {
    type Target = T;

    fn is_null(&self) -> bool {
        self.0.is_null()
    }

    fn get(&self) -> Option<&T> {
        self.0.get()
    }

    fn get_mut(&mut self) -> Option<&mut T> {
        self.0.get_mut()
    }
}

impl<T: NdrEncode + 'static> NdrEncode for FullPtr<T> {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_referent(&self.0)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl<T: NdrDecode + 'static> NdrDecode for FullPtr<T> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        Ok(Self(r.read_referent()?))
    }

    fn ndr_align() -> usize {
        4
    }
}
