mod close_and_drop;
mod connectivity;
mod resume;
