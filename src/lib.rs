#[macro_export]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		#[cfg(debug_assertions)]
		{
			eprintln!($($arg)*);
		}
	}};
}

pub mod config;
pub mod matches;
pub mod filters;
pub mod gateway;
pub mod search;
pub mod naming;
pub mod resolver;
pub mod highlight;
pub mod symbols;
pub mod session;
pub mod editor;
