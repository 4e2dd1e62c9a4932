mod open_flags;
mod stat;
