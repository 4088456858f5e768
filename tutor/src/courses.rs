//! Static course catalog.

/// A course and its topics.
#[derive(Debug, Clone, Copy)]
pub struct Course {
    /// Short identifier used on the command line.
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub topics: &'static [&'static str],
}

/// All available courses.
pub const COURSES: &[Course] = &[
    Course {
        slug: "python",
        name: "Python Programming",
        description: "Master the basics and advanced concepts of Python.",
        topics: &[
            "Introduction to Python",
            "Variables and Data Types",
            "Control Flow",
            "Functions",
            "Object-Oriented Programming",
            "Modules and Packages",
        ],
    },
    Course {
        slug: "javascript",
        name: "JavaScript Fundamentals",
        description: "Learn the language of the web, from basics to modern frameworks.",
        topics: &[
            "Introduction to JavaScript",
            "DOM Manipulation",
            "Asynchronous JavaScript",
            "ES6+ Features",
            "Introduction to React",
            "Node.js Basics",
        ],
    },
    Course {
        slug: "cplusplus",
        name: "C++ for Beginners",
        description: "Get started with this powerful language used for systems programming and game development.",
        topics: &[
            "Introduction to C++",
            "Pointers and References",
            "Classes and Objects",
            "Standard Template Library (STL)",
            "Memory Management",
        ],
    },
    Course {
        slug: "react",
        name: "Modern Web Development with React",
        description: "Build dynamic and interactive user interfaces with the React library.",
        topics: &[
            "Introduction to React & JSX",
            "Components and Props",
            "State and Lifecycle",
            "Hooks",
            "React Router",
            "State Management (Redux/Zustand)",
        ],
    },
];

/// Look up a course by slug (case-insensitive).
pub fn find(slug: &str) -> Option<&'static Course> {
    COURSES.iter().find(|c| c.slug.eq_ignore_ascii_case(slug.trim()))
}
