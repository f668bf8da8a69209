pub mod capability;
pub mod class;
pub mod dataflow;
pub mod element;
pub mod error;
pub mod factory;
pub mod graph;
pub mod id;
pub mod ops;

// Re-export commonly used types
pub use capability::{Capability, NodeKind};
pub use dataflow::{DataFlow, DataFlowGraph, DataFlowSlot, FlowLink, Resolved, SlotCategory};
pub use element::{Annotation, AnnotationContent, Element, NodeData, NumberValue, SlotList};
pub use error::CoreError;
pub use factory::{DefaultFactory, Factory};
pub use graph::{AbsoluteBinding, ProgramGraph};
pub use id::{DataFlowId, ElementId, IdAllocator};
pub use ops::{ArgShape, ArgSpec, OpArg, OpKind, OpView};
