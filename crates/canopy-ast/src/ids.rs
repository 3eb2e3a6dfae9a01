//! Monotonic id allocation shared by lowering and the AST rewriters.
//!
//! A straight CST->AST lowering gives a node the same id as its CST
//! origin. Rewriters (defdec/macro expansion) synthesize nodes with no
//! single CST origin (a substituted parameter, a spliced `<body>`); those
//! draw fresh ids from this allocator, seeded above the highest id the
//! parser handed out so the two id spaces never collide.

#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    #[must_use]
    pub fn starting_after(max_cst_id: u32) -> Self {
        Self {
            next: max_cst_id + 1,
        }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}
