// Screen geometry and the page height budget.
//
// Every pagination decision is taken against max_page_height(); the
// scan, the page load and the prefetch all cost lines through
// line_cost() so they can never disagree about where a page ends.

pub const LCD_WIDTH: u16 = 300;
pub const LCD_HEIGHT: u16 = 400;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub width: u16,
    pub height: u16,
    pub margin: u16,
    /// Height reserved for the title row.
    pub header_height: u16,
    pub title_content_spacing: u16,
    pub content_footer_spacing: u16,
    /// Cost of a blank line (paragraph break).
    pub paragraph_spacing: u16,
    pub line_height: u16,
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Layout {
    pub const DEFAULT: Self = Self {
        width: LCD_WIDTH,
        height: LCD_HEIGHT,
        margin: 20,
        header_height: 16,
        title_content_spacing: 12,
        content_footer_spacing: 20,
        paragraph_spacing: 8,
        line_height: 22,
    };

    #[inline]
    pub const fn content_start_y(&self) -> u16 {
        self.margin + self.header_height + self.title_content_spacing
    }

    #[inline]
    pub const fn content_end_y(&self) -> u16 {
        self.height
            .saturating_sub(self.margin)
            .saturating_sub(self.content_footer_spacing)
    }

    #[inline]
    pub const fn max_page_height(&self) -> u32 {
        self.content_end_y().saturating_sub(self.content_start_y()) as u32
    }

    #[inline]
    pub const fn content_width(&self) -> u32 {
        self.width.saturating_sub(2 * self.margin) as u32
    }

    // title baseline sits a few pixels above the margin line
    #[inline]
    pub const fn title_y(&self) -> u16 {
        self.margin.saturating_sub(3)
    }

    #[inline]
    pub const fn separator_y(&self) -> u16 {
        self.margin + 12
    }

    #[inline]
    pub const fn footer_y(&self) -> u16 {
        self.height.saturating_sub(self.margin).saturating_sub(12)
    }

    #[inline]
    pub const fn tip_y(&self) -> u16 {
        self.footer_y().saturating_sub(16)
    }

    /// Vertical cost of one wrapped line: blank lines are paragraph gaps.
    #[inline]
    pub fn line_cost(&self, line: &str) -> u32 {
        if line.is_empty() {
            self.paragraph_spacing as u32
        } else {
            self.line_height as u32
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.content_width() == 0 {
            return Err("layout: no horizontal room for text");
        }
        if self.line_height == 0 {
            return Err("layout: zero line height");
        }
        let tallest = self.line_height.max(self.paragraph_spacing) as u32;
        if tallest > self.max_page_height() {
            return Err("layout: line taller than page");
        }
        Ok(())
    }
}

/// Running height of the page being filled.
#[derive(Clone, Copy, Debug)]
pub struct PageBudget {
    used: u32,
    max: u32,
}

impl PageBudget {
    pub const fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    // a page that holds nothing yet accepts any line, so an oversize
    // geometry still makes progress instead of emitting empty pages
    #[inline]
    pub fn fits(&self, cost: u32) -> bool {
        self.used == 0 || self.used + cost <= self.max
    }

    #[inline]
    pub fn push(&mut self, cost: u32) {
        self.used += cost;
    }

    #[inline]
    pub fn reset(&mut self) {
        self.used = 0;
    }

    #[inline]
    pub fn used(&self) -> u32 {
        self.used
    }
}
