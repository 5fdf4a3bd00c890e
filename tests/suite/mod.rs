mod drop_flow;
mod persistence;
mod reconciliation;
mod transfer;
