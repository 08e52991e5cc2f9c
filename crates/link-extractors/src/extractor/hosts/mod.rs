pub mod mixdrop;
pub mod upcloud;
