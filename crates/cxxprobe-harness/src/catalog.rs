//! Snippet catalog.
//!
//! Each [`FeatureCase`] is a tiny standalone C++ program exercising one
//! language or library capability. A case passes when the program compiles
//! and, when the run step is enabled, exits with status zero.

use serde::{Deserialize, Serialize};

/// Which half of the catalog a case belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    /// Needed for standard builds.
    Required,
    /// Needed only for extras such as multithreading.
    Optional,
}

impl Group {
    /// Label used in summary lines.
    #[must_use]
    pub const fn summary_label(self) -> &'static str {
        match self {
            Self::Required => "Main Tests:",
            Self::Optional => "Optional Tests:",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
        }
    }
}

/// A named snippet probing one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureCase {
    pub name: &'static str,
    pub source: &'static str,
}

impl FeatureCase {
    #[must_use]
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }
}

/// The full set of cases, split into required and optional groups.
///
/// Both groups are kept sorted by name; iteration order is part of the
/// tool's visible output.
#[derive(Debug, Clone)]
pub struct Catalog {
    required: Vec<FeatureCase>,
    optional: Vec<FeatureCase>,
}

impl Catalog {
    /// Build a catalog from arbitrary-order groups.
    #[must_use]
    pub fn new(
        required: impl IntoIterator<Item = FeatureCase>,
        optional: impl IntoIterator<Item = FeatureCase>,
    ) -> Self {
        Self {
            required: sorted(required),
            optional: sorted(optional),
        }
    }

    /// The built-in catalog.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(REQUIRED.iter().copied(), OPTIONAL.iter().copied())
    }

    #[must_use]
    pub fn group(&self, group: Group) -> &[FeatureCase] {
        match group {
            Group::Required => &self.required,
            Group::Optional => &self.optional,
        }
    }

    /// Column width for progress and summary lines: the longest case name
    /// across both groups, plus one for the trailing colon.
    #[must_use]
    pub fn name_width(&self) -> usize {
        self.required
            .iter()
            .chain(&self.optional)
            .map(|case| case.name.len() + 1)
            .max()
            .unwrap_or(0)
    }
}

fn sorted(cases: impl IntoIterator<Item = FeatureCase>) -> Vec<FeatureCase> {
    let mut cases: Vec<FeatureCase> = cases.into_iter().collect();
    cases.sort_by(|a, b| a.name.cmp(b.name));
    cases
}

/// Prints which C++ standard library the compiler links against.
pub const STDLIB_IDENTITY_SOURCE: &str = r#"#if defined(__has_include)
#  if __has_include(<version>)
#    include <version>
#  else
#    include <ciso646>
#  endif
#else
#  include <ciso646>
#endif
#include <cstdio>
int main() {
#if defined(_LIBCPP_VERSION)
    std::printf("libc++ %d\n", (int)_LIBCPP_VERSION);
#elif defined(__GLIBCXX__)
    std::printf("libstdc++ %ld\n", (long)__GLIBCXX__);
#elif defined(_MSVC_STL_VERSION)
    std::printf("MSVC STL %d\n", (int)_MSVC_STL_VERSION);
#else
    std::printf("unknown\n");
#endif
    return 0;
}
"#;

const REQUIRED: &[FeatureCase] = &[
    FeatureCase::new(
        "AUTO",
        r#"
int main() {
    int m(0);
    auto s(m);
    return s;
}
"#,
    ),
    FeatureCase::new(
        "RANGE FOR",
        r#"#include <vector>
int main() {
    std::vector<int> v(4, 2);
    for (int s : v) { (void)s; }
    return 0;
}
"#,
    ),
    FeatureCase::new(
        "MAP AT()",
        r#"#include <map>
int main() {
    std::map<int, int> m;
    m[1] = 0;
    return m.at(1);
}
"#,
    ),
    FeatureCase::new(
        "INITIALIZER LIST",
        r#"#include <vector>
#include <map>
int main() {
    std::vector<int> v = {1, 2, 3, 4, 5};
    std::map<int, float> m = { {1, 1.1f}, {2, 2.2f}, {3, 3.3f}, {4, 4.4f}, {5, 5.5f} };
    return (v.size() == 5 && m.size() == 5) ? 0 : 1;
}
"#,
    ),
    FeatureCase::new(
        "UNORDERED MAP",
        r#"#include <unordered_map>
int main() {
    std::unordered_map<int, int> um;
    um[1] = 0;
    return um[1];
}
"#,
    ),
    FeatureCase::new(
        "SMART POINTERS",
        r#"#include <memory>
int main() {
    typedef std::shared_ptr<int> intOP;
    intOP x(new int(0));
    return *x;
}
"#,
    ),
    FeatureCase::new(
        "NULLPTR",
        r#"#include <memory>
int main() {
    int* x(nullptr);
    return x == nullptr ? 0 : 1;
}
"#,
    ),
    FeatureCase::new(
        "MOVE",
        r#"#include <utility>
class Movable {
    int content_;
public:
    Movable(int val, int) : content_(val) {}
    Movable(Movable&& rval) : content_(0) {
        std::swap(content_, rval.content_);
    }
    int content() const { return content_; }
};
int main() {
    Movable y(std::move(Movable(3, 4)));
    return y.content() == 3 ? 0 : 1;
}
"#,
    ),
    FeatureCase::new(
        "LAMBDA",
        r#"#include <algorithm>
#include <vector>
int main() {
    std::vector<int> v = {1, 2, 3, 4, 5, 6, 7};
    int x = 4;
    v.erase(std::remove_if(v.begin(), v.end(), [x](int n) { return n < x; }), v.end());
    return v.size() == 4 ? 0 : 1;
}
"#,
    ),
    FeatureCase::new(
        "INTEGRATION",
        r#"#include <map>
#include <memory>
#include <unordered_map>
typedef std::shared_ptr<int> intOP;
std::map<int, intOP> get_map() {
    std::unordered_map<int, intOP> mymap{
        {3, nullptr}, {4, std::make_shared<int>(5)}, {1, nullptr}, {2, std::make_shared<int>(4)}};
    return std::map<int, intOP>(mymap.begin(), mymap.end());
}
int main() {
    int total(0);
    std::map<int, intOP> const m(get_map());
    for (auto s : m) {
        if (s.second) { total += *s.second; }
    }
    total += *m.at(2);
    return total == 13 ? 0 : 1;
}
"#,
    ),
];

const OPTIONAL: &[FeatureCase] = &[
    FeatureCase::new(
        "THREAD LOCAL",
        r#"
int main() {
    thread_local int x(0);
    return x;
}
"#,
    ),
    FeatureCase::new(
        "THREAD",
        r#"#include <mutex>
#include <thread>
int main() {
    std::mutex lock;
    int counter(0);
    std::thread worker([&]() {
        std::lock_guard<std::mutex> guard(lock);
        ++counter;
    });
    worker.join();
    return counter == 1 ? 0 : 1;
}
"#,
    ),
    FeatureCase::new(
        "REGEX",
        r#"#include <regex>
#include <string>
int main() {
    std::string s("find substring");
    std::regex reg("sub");
    return std::regex_search(s, reg) ? 0 : 1;
}
"#,
    ),
];
