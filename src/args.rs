use std::fmt;

/// 单个命令行记号
///
/// `Quoted` 记号在渲染为命令行文本时会用双引号包裹，
/// 保证包含空格的路径等值作为一个参数传给外部进程。
/// 除包裹外不做字符转义。
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Plain(String),
    Quoted(String),
}

impl Token {
    fn value(&self) -> &str {
        match self {
            Token::Plain(v) | Token::Quoted(v) => v,
        }
    }
}

/// 有序的命令行参数构建器
///
/// 记号顺序即参数顺序: 序列号参数在前，其后是子命令动词、
/// 选项开关，最后是位置参数。每次调用重新构建，不跨调用复用。
#[derive(Debug, Clone, Default)]
pub struct ArgumentBuilder {
    tokens: Vec<Token>,
}

impl ArgumentBuilder {
    /// 创建空的参数构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个普通记号
    pub fn append(&mut self, token: impl Into<String>) -> &mut Self {
        self.tokens.push(Token::Plain(token.into()));
        self
    }

    /// 追加一个需要引号包裹的记号（路径、含空格的值）
    pub fn append_quoted(&mut self, token: impl Into<String>) -> &mut Self {
        self.tokens.push(Token::Quoted(token.into()));
        self
    }

    /// 按顺序返回各记号的值，每个记号对应外部进程的一个参数
    pub fn as_args(&self) -> Vec<&str> {
        self.tokens.iter().map(Token::value).collect()
    }

    /// 渲染为单行命令文本，仅用于日志输出
    pub fn to_command_line(&self) -> String {
        let rendered: Vec<String> = self
            .tokens
            .iter()
            .map(|t| match t {
                Token::Plain(v) => v.clone(),
                Token::Quoted(v) => format!("\"{}\"", v),
            })
            .collect();
        rendered.join(" ")
    }

    /// 记号数量
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for ArgumentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_command_line())
    }
}
