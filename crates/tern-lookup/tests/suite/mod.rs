mod binary;
mod identity;
mod modules;
mod pipeline;
