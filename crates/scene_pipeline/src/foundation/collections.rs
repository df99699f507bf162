//! Stable handle types
//!
//! Every cross-reference inside the pipeline (tree parents, batch members,
//! GPU buffers, binding sets) is a generational slot-map key rather than a
//! pointer, so removing an element never leaves a dangling reference behind:
//! a stale key simply stops resolving.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle to a node in the scene graph arena
    pub struct NodeId;

    /// Handle to one registered instance inside a render storage
    pub struct InstanceHandle;

    /// Handle to a buffer owned by a GPU allocator
    pub struct GpuBufferHandle;

    /// Handle to a binding (descriptor) set owned by a binding backend
    pub struct BindingSetHandle;
}
