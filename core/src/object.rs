/// An index into the VM-owned object arena. Stands in for the source
/// language's intrusive "next" pointer: every heap object is registered
/// in the arena at construction and released in one sweep at VM
/// teardown, per the spec's "owned handle vector" restatement of the
/// intrusive all-objects list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
  Str,
  Map,
  Function,
  Native,
}
