pub mod deployment_operation;
