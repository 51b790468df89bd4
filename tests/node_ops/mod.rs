mod acl;
mod crud;
