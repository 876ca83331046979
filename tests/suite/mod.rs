mod aggregate;
mod materialize;
