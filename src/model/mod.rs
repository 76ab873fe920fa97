/*!
 * The annotation-graph document model.
 *
 * - `element`: element kinds, handles and content
 * - `idref`: id-ref syntax
 * - `package`: element catalogs, imports, id-ref resolution and cleaning
 * - `relation`: ordered, lazily resolved member sequences
 * - `slice`: slice bounds over relation positions
 * - `cleaning`: the deferred write queue
 * - `group`: per-kind views over element collections
 */

pub mod cleaning;
pub mod element;
pub mod group;
pub mod idref;
pub mod package;
pub mod relation;
pub mod slice;

pub use cleaning::{MemberOperation, WriteQueue};
pub use element::{Content, Element, ElementKind};
pub use group::{Group, KindView};
pub use idref::IdRef;
pub use package::Package;
pub use relation::{Member, Relation, Resolution};
pub use slice::Slice;
