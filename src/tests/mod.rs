mod common;

mod dispatch_end_to_end;
