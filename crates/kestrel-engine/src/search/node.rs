//! Compile-time node kinds for the alpha-beta search.

/// Node searched with a zero-width window; most pruning applies here.
pub struct NonPv;

/// Node on the principal variation, searched with an open window.
pub struct Pv;

/// The root of the search tree.
pub struct Root;

/// Selects the specialisation of the node search at compile time.
pub trait NodeType {
    /// True for [`Pv`] and [`Root`].
    const PV: bool;
    const ROOT: bool;
}

impl NodeType for NonPv {
    const PV: bool = false;
    const ROOT: bool = false;
}

impl NodeType for Pv {
    const PV: bool = true;
    const ROOT: bool = false;
}

impl NodeType for Root {
    const PV: bool = true;
    const ROOT: bool = true;
}
