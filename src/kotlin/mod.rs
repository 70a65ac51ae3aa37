//! Kotlin source model: a tolerant parser and a span-carrying syntax tree.

pub mod ast;
pub mod parser;

pub use ast::{
    Block, ClassBody, Expr, Function, Import, InitBlock, KotlinClass, KotlinFile, Member, Param,
    Property, SuperTypeEntry, WhenEntry,
};
pub use parser::parse_kotlin;
