// rest/routes — HTTP handler modules, one per resource group.

pub mod auth;
pub mod health;
pub mod tasks;
