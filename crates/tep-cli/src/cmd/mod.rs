pub mod issue_body;
pub mod proposal;
pub mod proposals;
pub mod reconcile;
