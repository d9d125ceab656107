//! Infrastructure 層
//!
//! ドメイン層が定義する trait の具体的な実装と、外部とのデータ形式（DTO）。

pub mod dto;
pub mod registry;
pub mod repository;
pub mod store;
pub mod translator;
